//! Raw limit validation.
//!
//! The validation gate exists so that enforcement code never re-checks
//! caller input: a [`Limits`] value is non-negative by construction, and
//! a zero raw value means "unlimited".

use crate::config::types::{Limits, Result, SandboxError};

/// Validate four raw ceilings and build an immutable [`Limits`].
///
/// Fails with [`SandboxError::InvalidLimit`] naming the offending field if
/// any value is negative; this is rejected before any spawn is attempted.
pub fn validated_limits(
    cpu_seconds: i64,
    memory_megabytes: i64,
    max_processes: i64,
    max_file_megabytes: i64,
) -> Result<Limits> {
    Ok(Limits {
        cpu_seconds: ceiling("cpu", cpu_seconds)?,
        memory_megabytes: ceiling("memory", memory_megabytes)?,
        max_processes: ceiling("process", max_processes)?,
        max_file_megabytes: ceiling("file-size", max_file_megabytes)?,
    })
}

fn ceiling(field: &'static str, value: i64) -> Result<Option<u64>> {
    match value {
        v if v < 0 => Err(SandboxError::InvalidLimit { field, value: v }),
        0 => Ok(None),
        v => Ok(Some(v as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_means_unlimited() {
        let limits = validated_limits(0, 0, 0, 0).unwrap();
        assert!(limits.is_unlimited());
    }

    #[test]
    fn positive_values_become_ceilings() {
        let limits = validated_limits(2, 100, 10, 50).unwrap();
        assert_eq!(limits.cpu_seconds, Some(2));
        assert_eq!(limits.memory_megabytes, Some(100));
        assert_eq!(limits.max_processes, Some(10));
        assert_eq!(limits.max_file_megabytes, Some(50));
    }

    #[test]
    fn maximum_raw_ceiling_is_valid_and_saturates_in_bytes() {
        let limits = validated_limits(0, i64::MAX, 0, i64::MAX).unwrap();
        assert_eq!(limits.memory_bytes(), Some(u64::MAX));
        assert_eq!(limits.file_size_bytes(), Some(u64::MAX));
    }

    #[test]
    fn negative_value_is_rejected_and_names_the_field() {
        let err = validated_limits(1, -5, 0, 0).unwrap_err();
        match err {
            SandboxError::InvalidLimit { field, value } => {
                assert_eq!(field, "memory");
                assert_eq!(value, -5);
            }
            other => panic!("expected InvalidLimit, got {other:?}"),
        }
        assert!(validated_limits(-1, 0, 0, 0).is_err());
        assert!(validated_limits(0, 0, -1, 0).is_err());
        assert!(validated_limits(0, 0, 0, -1).is_err());
    }
}
