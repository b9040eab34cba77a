//! Kernel device number lookup via `lvdisplay`.
//!
//! Only called once the volume is active, so there is no race to tolerate:
//! anything other than a single `major;minor` row is an error.

use tracing::debug;

use crate::error::{Error, Result};
use crate::lvm::DeviceNumber;
use crate::process::{Cmd, CommandRunner};

const SEPARATOR: char = ';';

/// Look up the major/minor numbers of `vg_name/lv_name`.
pub fn device_numbers(
    runner: &dyn CommandRunner,
    tool: &str,
    vg_name: &str,
    lv_name: &str,
) -> Result<DeviceNumber> {
    let cmd = Cmd::new(tool)
        .args(["-C", "--noheadings", "-o", "lv_kernel_major,lv_kernel_minor"])
        .args(["--separator".to_string(), SEPARATOR.to_string()])
        .args(["-S".to_string(), format!("lv_name={lv_name}")])
        .arg(vg_name)
        .error_msg(format!("failed to query device numbers of '{vg_name}/{lv_name}'"));

    let result = cmd.run_with(runner)?;
    let number =
        parse_device_numbers(&result.stdout).map_err(|reason| Error::MalformedOutput {
            command: cmd.to_string(),
            reason,
            output: result.combined(),
        })?;

    debug!(
        vg = vg_name,
        lv = lv_name,
        major = number.major,
        minor = number.minor,
        "looked up device numbers"
    );
    Ok(number)
}

/// Parse `lvdisplay` output holding exactly one `major;minor` row.
pub fn parse_device_numbers(output: &str) -> std::result::Result<DeviceNumber, String> {
    let rows: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let row = match rows.as_slice() {
        [row] => *row,
        [] => return Err("no matching logical volume".to_string()),
        _ => return Err(format!("expected one row, got {}", rows.len())),
    };

    let fields: Vec<&str> = row.split(SEPARATOR).map(str::trim).collect();
    let [major, minor] = fields.as_slice() else {
        return Err(format!("expected 2 fields, got {}", fields.len()));
    };

    let parse = |name: &str, value: &str| {
        value
            .parse::<u64>()
            .map_err(|_| format!("{name} number '{value}' is not a non-negative integer"))
    };

    Ok(DeviceNumber {
        major: parse("major", *major)?,
        minor: parse("minor", *minor)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_parse_simple_row() {
        assert_eq!(
            parse_device_numbers("8;3").unwrap(),
            DeviceNumber { major: 8, minor: 3 }
        );
        assert_eq!(
            parse_device_numbers("  253;0\n").unwrap(),
            DeviceNumber {
                major: 253,
                minor: 0
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        assert!(parse_device_numbers("8;3;1").is_err());
        assert!(parse_device_numbers("8").is_err());
        assert!(parse_device_numbers("").is_err());
        assert!(parse_device_numbers("a;3").is_err());
        assert!(parse_device_numbers("-1;3").is_err());
        assert!(parse_device_numbers("253;0\n253;1\n").is_err());
    }

    #[test]
    fn test_lookup_arguments() {
        let runner = ScriptedRunner::new();
        runner.push("lvdisplay", 0, "  253;0\n");

        let number = device_numbers(&runner, "lvdisplay", "vgroot", "root").unwrap();
        assert_eq!(
            number,
            DeviceNumber {
                major: 253,
                minor: 0
            }
        );
        assert_eq!(
            runner.calls_to("lvdisplay"),
            vec![
                "lvdisplay -C --noheadings -o lv_kernel_major,lv_kernel_minor --separator ; -S lv_name=root vgroot"
            ]
        );
    }

    #[test]
    fn test_wrong_arity_fails_without_retry() {
        let runner = ScriptedRunner::new();
        runner.push("lvdisplay", 0, "8;3;1");
        runner.push("lvdisplay", 0, "8;3");

        let err = device_numbers(&runner, "lvdisplay", "vg", "lv").unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { .. }));
        assert!(err.to_string().contains("8;3;1"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_non_zero_exit_carries_output() {
        let runner = ScriptedRunner::new();
        runner.push("lvdisplay", 5, "  Volume group \"vg\" not found");

        let err = device_numbers(&runner, "lvdisplay", "vg", "lv").unwrap_err();
        assert!(matches!(err, Error::Tool { status: Some(5), .. }));
        assert!(err.to_string().contains("Volume group \"vg\" not found"));
    }
}
