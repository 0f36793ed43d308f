//! Resident registry.

use chrono::{DateTime, Utc};

use crate::domain::{QualityGateError, Resident, Result};
use crate::store::GateDocument;

/// Insert or replace a resident. Re-registering keeps the original
/// `registered_at` and replaces everything else.
pub fn register_resident<I, S>(
    doc: &mut GateDocument,
    resident_id: &str,
    name: &str,
    specializations: I,
    focus_statement: Option<String>,
    now: DateTime<Utc>,
) -> Result<Resident>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if resident_id.trim().is_empty() {
        return Err(QualityGateError::MissingField("resident_id"));
    }
    if name.trim().is_empty() {
        return Err(QualityGateError::MissingField("name"));
    }

    let registered_at = doc
        .residents
        .get(resident_id)
        .map(|r| r.registered_at)
        .unwrap_or(now);
    let focus_statement = focus_statement.filter(|f| !f.trim().is_empty());
    let resident = Resident::new(
        resident_id,
        name.trim(),
        specializations,
        focus_statement,
        registered_at,
    );

    doc.residents
        .insert(resident.resident_id.clone(), resident.clone());
    Ok(resident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QA_CAPABILITY;

    #[test]
    fn test_register_is_idempotent_upsert() {
        let mut doc = GateDocument::default();
        let t0 = Utc::now();
        let first =
            register_resident(&mut doc, "resident_qa", "Quinn", ["qa"], None, t0).unwrap();
        let t1 = t0 + chrono::Duration::seconds(10);
        let second = register_resident(
            &mut doc,
            "resident_qa",
            "Quinn A.",
            ["qa", "review"],
            Some("flaky tests".to_string()),
            t1,
        )
        .unwrap();

        assert_eq!(doc.residents.len(), 1);
        assert_eq!(second.registered_at, first.registered_at);
        assert_eq!(second.name, "Quinn A.");
        assert!(second.has_capability(QA_CAPABILITY));
        assert_eq!(second.focus_statement.as_deref(), Some("flaky tests"));
    }

    #[test]
    fn test_register_requires_id_and_name() {
        let mut doc = GateDocument::default();
        let none: [&str; 0] = [];
        assert!(matches!(
            register_resident(&mut doc, "", "n", none, None, Utc::now()),
            Err(QualityGateError::MissingField("resident_id"))
        ));
        assert!(matches!(
            register_resident(&mut doc, "r", " ", none, None, Utc::now()),
            Err(QualityGateError::MissingField("name"))
        ));
    }

    #[test]
    fn test_blank_focus_statement_dropped() {
        let mut doc = GateDocument::default();
        let r = register_resident(&mut doc, "r", "n", ["qa"], Some("  ".into()), Utc::now())
            .unwrap();
        assert!(r.focus_statement.is_none());
    }
}
