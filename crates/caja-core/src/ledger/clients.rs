//! Client registration.

use chrono::{DateTime, Utc};

use crate::document::{Plan, ReadSet, Snapshot, WriteSet};
use crate::error::{CoreError, CoreResult};
use crate::types::Client;
use crate::validation::validate_client_name;

pub fn client_reads(id: &str) -> ReadSet {
    ReadSet::new().doc::<Client>(id)
}

/// Creates a client with zero debt under a pre-minted id.
pub fn plan_register_client(
    snapshot: &Snapshot,
    id: &str,
    name: &str,
    now: DateTime<Utc>,
) -> CoreResult<Plan<Client>> {
    validate_client_name(name)?;
    if snapshot.get::<Client>(id)?.is_some() {
        return Err(CoreError::duplicate("Client", id));
    }

    let client = Client::new(id, name.trim(), now);
    let mut writes = WriteSet::new();
    writes.put(&client)?;
    Ok(Plan::new(writes, client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::{with_absent, with_doc};

    #[test]
    fn test_register_client() {
        let mut snapshot = Snapshot::new();
        with_absent::<Client>(&mut snapshot, "c1");

        let plan = plan_register_client(&snapshot, "c1", "  Ana Pérez ", Utc::now()).unwrap();
        assert_eq!(plan.value.name, "Ana Pérez");
        assert_eq!(plan.value.current_debt_cents, 0);

        let mut snapshot = Snapshot::new();
        with_doc(&mut snapshot, &plan.value);
        assert!(matches!(
            plan_register_client(&snapshot, "c1", "Ana", Utc::now()),
            Err(CoreError::Duplicate { .. })
        ));
        assert!(plan_register_client(&snapshot, "c2", "", Utc::now()).is_err());
    }
}
