//! Ledger persistence layer
//!
//! Provides save/load functionality for the token state.

use crate::token::MicroEth;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".microeth_data"),
            ledger_file: "ledger.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Ledger storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    fn ledger_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.ledger_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.ledger_file, index))
    }

    /// Save the token state to disk
    pub fn save(&self, token: &MicroEth) -> Result<(), StorageError> {
        let path = self.ledger_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self.config.data_dir.join("ledger.tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, token)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::info!(
            "Saved ledger ({} events) to {:?}",
            token.events().len(),
            path
        );
        Ok(())
    }

    /// Load the token state from disk, rejecting states that fail the audit
    pub fn load(&self) -> Result<MicroEth, StorageError> {
        let path = self.ledger_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Ledger file not found".to_string(),
            ));
        }

        load_from_file(&path)
    }

    /// Check if a saved ledger exists
    pub fn exists(&self) -> bool {
        self.ledger_path().exists()
    }

    /// Delete the saved ledger
    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.ledger_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<MicroEth, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        load_from_file(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|&i| self.backup_path(i).exists())
            .collect()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }
}

/// Reject states whose config or accounting does not hold together
fn verify(token: &MicroEth) -> Result<(), StorageError> {
    token
        .config()
        .validate()
        .map_err(|e| StorageError::InvalidData(e.to_string()))?;

    let report = token.audit();
    if !report.is_healthy() {
        log::warn!("Ledger audit failed: {:?}", report);
        return Err(StorageError::InvalidData(format!(
            "Ledger audit failed (conserved: {}, backed: {})",
            report.conserved(),
            report.backed()
        )));
    }
    if !token.events().is_contiguous() {
        return Err(StorageError::InvalidData(
            "Event sequence numbers are not contiguous".to_string(),
        ));
    }
    Ok(())
}

/// Save token state to a specific file path
pub fn save_to_file(token: &MicroEth, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, token)?;
    Ok(())
}

/// Load token state from a specific file path
pub fn load_from_file(path: &Path) -> Result<MicroEth, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let token: MicroEth = serde_json::from_reader(reader)?;
    verify(&token)?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, WEI_PER_MICRO_ETH};

    fn temp_storage(max_backups: usize) -> (tempfile::TempDir, Storage) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            max_backups,
            ..Default::default()
        };
        let storage = Storage::new(config).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_save_load_ledger() {
        let (_dir, storage) = temp_storage(5);
        let alice = Address::new([1u8; 20]);
        let bob = Address::new([2u8; 20]);

        let mut token = MicroEth::default();
        token.deposit(&alice, 10 * WEI_PER_MICRO_ETH).unwrap();
        token.approve(&alice, &bob, 42).unwrap();
        token.transfer(&alice, &bob, 7).unwrap();

        storage.save(&token).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.balance_of(&alice), token.balance_of(&alice));
        assert_eq!(loaded.balance_of(&bob), 7);
        assert_eq!(loaded.allowance(&alice, &bob), 42);
        assert_eq!(loaded.reserve(), 10 * WEI_PER_MICRO_ETH);
        assert_eq!(loaded.events().records(), token.events().records());
        assert_eq!(loaded.config(), token.config());
    }

    #[test]
    fn test_load_missing() {
        let (_dir, storage) = temp_storage(5);
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn test_load_rejects_unbacked_state() {
        let (dir, storage) = temp_storage(5);
        let mut token = MicroEth::default();
        token
            .deposit(&Address::new([1u8; 20]), WEI_PER_MICRO_ETH)
            .unwrap();
        storage.save(&token).unwrap();

        // Tamper with the reserve
        let path = dir.path().join("ledger.json");
        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["reserve"] = serde_json::json!(1);
        fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn test_backup_rotation() {
        let (_dir, storage) = temp_storage(3);
        let mut token = MicroEth::default();
        let alice = Address::new([1u8; 20]);

        for _ in 0..5 {
            storage.save(&token).unwrap();
            token.deposit(&alice, WEI_PER_MICRO_ETH).unwrap();
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);

        // Newest backup is the state before the last save
        let restored = storage.restore_backup(0).unwrap();
        assert_eq!(restored.events().len(), 3);
        assert!(storage.restore_backup(7).is_err());
    }

    #[test]
    fn test_export_import() {
        let (dir, _storage) = temp_storage(5);
        let mut token = MicroEth::default();
        token
            .deposit(&Address::new([3u8; 20]), 5 * WEI_PER_MICRO_ETH)
            .unwrap();

        let path = dir.path().join("export.json");
        save_to_file(&token, &path).unwrap();
        let imported = load_from_file(&path).unwrap();
        assert_eq!(imported.total_supply(), token.total_supply());
    }
}
