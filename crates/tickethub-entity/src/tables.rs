//! Store table names.

/// Registered users.
pub const USERS: &str = "users";
/// Warehouses where incidents occur.
pub const WAREHOUSES: &str = "warehouses";
/// Carriers involved in shipments.
pub const SHIPPING_COMPANIES: &str = "shipping_companies";
/// Trouble classification master data.
pub const TROUBLE_TYPES: &str = "trouble_types";
/// Damage classification master data.
pub const DAMAGE_TYPES: &str = "damage_types";
/// Incident reports.
pub const INCIDENTS: &str = "incidents";
/// Files attached to incidents.
pub const ATTACHMENTS: &str = "attachments";
/// Countermeasure effectiveness measurements.
pub const EFFECTIVENESS: &str = "effectiveness_measurements";
/// Audit trail.
pub const AUDIT_LOGS: &str = "audit_logs";

/// Every table, in dependency order (referenced tables first).
pub const ALL: &[&str] = &[
    USERS,
    WAREHOUSES,
    SHIPPING_COMPANIES,
    TROUBLE_TYPES,
    DAMAGE_TYPES,
    INCIDENTS,
    ATTACHMENTS,
    EFFECTIVENESS,
    AUDIT_LOGS,
];
