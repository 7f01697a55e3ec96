// Application Constants
// Centralized constants to avoid magic numbers and stringly-typed keys

/// Document store collection names
pub const VEHICLES_COLLECTION: &str = "vehicles";
pub const COMPANIES_COLLECTION: &str = "companies";
pub const RECORDS_COLLECTION: &str = "turnstile_records";
pub const RECORD_LOGS_COLLECTION: &str = "turnstile_records_logs";

/// Local durable storage keys
pub const OFFLINE_QUEUE_KEY: &str = "turnstile_offline_queue";
pub const OPERATION_DAY_KEY: &str = "turnstile_operation_date";

/// Audit log actions
pub const ACTION_CREATE_OFFLINE_SYNC: &str = "create_offline_sync";

/// Pagination defaults
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const PAGE_SIZE_CHOICES: [u32; 4] = [10, 20, 50, 100];

/// Admin dashboard listing caps
pub const RECENT_RECORDS_LIMIT: usize = 20;
pub const MISMATCH_LISTING_LIMIT: usize = 10;
pub const OPEN_JOURNEY_LISTING_LIMIT: usize = 20;

/// Operator day export headers (semicolon dialect)
pub const DAY_EXPORT_HEADERS: [&str; 11] = [
    "Veículo",
    "Placa",
    "Empresa",
    "Física",
    "Eletrônica",
    "Ilegível",
    "Validador Defeituoso",
    "Observação",
    "JornadaFechada",
    "Operador",
    "CriadoEm",
];

/// Reports export headers (comma dialect)
pub const REPORT_EXPORT_HEADERS: [&str; 8] = [
    "Data da Operação",
    "Lançado em",
    "Veículo",
    "Placa",
    "Roleta Física",
    "Roleta Eletrônica",
    "Jornada",
    "Operador",
];

/// Placeholder shown when a vehicle or company reference cannot be resolved
pub const MISSING_REFERENCE_PLACEHOLDER: &str = "N/A";
