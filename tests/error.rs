//! Tests for error module

use stsdetect::{Result, StsError};

#[test]
fn test_configuration_error_display() {
    let err = StsError::Configuration("tile counts must be positive, got 0x5".to_string());
    assert!(err.to_string().contains("invalid configuration"));
    assert!(err.to_string().contains("0x5"));
}

#[test]
fn test_data_access_error_display() {
    let err = StsError::DataAccess("partition missing".to_string());
    assert!(err.to_string().contains("position read failed"));
    assert!(err.to_string().contains("partition missing"));
}

#[test]
fn test_io_error_converts() {
    fn read_nothing() -> Result<Vec<u8>> {
        let bytes = std::fs::read("/no/such/partition.csv")?;
        Ok(bytes)
    }
    assert!(matches!(read_nothing(), Err(StsError::Io(_))));
}
