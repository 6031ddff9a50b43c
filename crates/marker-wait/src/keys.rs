//! Marker and artifact key derivation for a job

/// Suffix of the marker written when the job starts
pub const STARTED_EXT: &str = ".started";

/// Suffix of the marker written when the job finished cleanly
pub const OK_EXT: &str = ".ok";

/// Suffix of the marker holding the job's failure text
pub const ERROR_EXT: &str = ".error";

/// Suffix of the final artifact
pub const ARTIFACT_EXT: &str = ".bz2.crypt";

/// All object keys belonging to one job. Every key is `name` plus a fixed suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKeys {
    pub name: String,
    pub started: String,
    pub ok: String,
    pub error: String,
    pub artifact: String,
}

impl JobKeys {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            started: format!("{}{}", name, STARTED_EXT),
            ok: format!("{}{}", name, OK_EXT),
            error: format!("{}{}", name, ERROR_EXT),
            artifact: format!("{}{}", name, ARTIFACT_EXT),
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::JobKeys;

    #[test]
    fn keys_are_name_plus_suffix() {
        for name in ["db", "backups/2024-01-01/main", "", "with space", "a.b"] {
            let keys = JobKeys::new(name);
            assert_eq!(keys.name, name);
            assert_eq!(keys.started, format!("{name}.started"));
            assert_eq!(keys.ok, format!("{name}.ok"));
            assert_eq!(keys.error, format!("{name}.error"));
            assert_eq!(keys.artifact, format!("{name}.bz2.crypt"));
        }
    }
}
