//! The Sleuth Kit command surface.
//!
//! Each TSK utility is treated as an opaque executable with a fixed argument
//! grammar; output is captured verbatim for the report writer. The only
//! reading of TSK output done here is the conservative scan of an mmls
//! partition table to pick a starting sector for full runs.

use std::path::Path;

pub const MMLS: &str = "mmls";
pub const FSSTAT: &str = "fsstat";
pub const FLS: &str = "fls";
pub const ICAT: &str = "icat";
pub const MACTIME: &str = "mactime";
pub const BLKCAT: &str = "blkcat";
pub const MMSTAT: &str = "mmstat";
pub const DD: &str = "dd";
pub const AUTOPSY: &str = "autopsy";

/// Tools the `verify` subcommand requires on PATH.
pub const REQUIRED_TOOLS: &[&str] = &[MMLS, FLS, ICAT, BLKCAT, FSSTAT, MMSTAT, MACTIME];

fn offset_args(offset: Option<u64>) -> Vec<String> {
    match offset {
        Some(sectors) if sectors > 0 => vec!["-o".to_string(), sectors.to_string()],
        _ => Vec::new(),
    }
}

pub fn mmls_args(image: &Path) -> Vec<String> {
    vec![image.to_string_lossy().to_string()]
}

pub fn fsstat_args(image: &Path, offset: Option<u64>) -> Vec<String> {
    let mut args = offset_args(offset);
    args.push(image.to_string_lossy().to_string());
    args
}

pub fn fls_args(image: &Path, offset: Option<u64>, recursive: bool) -> Vec<String> {
    let mut args = Vec::new();
    if recursive {
        args.push("-r".to_string());
    }
    args.extend(offset_args(offset));
    args.push(image.to_string_lossy().to_string());
    args
}

/// `fls -m / -r` emits body-file lines for mactime.
pub fn fls_bodyfile_args(image: &Path, offset: Option<u64>) -> Vec<String> {
    let mut args = vec!["-m".to_string(), "/".to_string(), "-r".to_string()];
    args.extend(offset_args(offset));
    args.push(image.to_string_lossy().to_string());
    args
}

pub fn icat_args(image: &Path, offset: Option<u64>, inode: u64) -> Vec<String> {
    let mut args = offset_args(offset);
    args.push(image.to_string_lossy().to_string());
    args.push(inode.to_string());
    args
}

pub fn mactime_args(body_file: &Path) -> Vec<String> {
    vec!["-b".to_string(), body_file.to_string_lossy().to_string()]
}

pub fn dd_args(source: &Path, output: &Path, block_size: &str) -> Vec<String> {
    vec![
        format!("if={}", source.display()),
        format!("of={}", output.display()),
        format!("bs={}", block_size),
        "conv=sync,noerror".to_string(),
    ]
}

/// Pick the starting sector of the first allocated filesystem partition from
/// an mmls table.
///
/// mmls partition rows look like:
///
/// ```text
/// 002:  000:000   0000000063   0000096389   0000096327   NTFS (0x07)
/// ```
///
/// Rows describing unallocated space or the partition table itself are
/// skipped. Returns `None` when no usable row is found; callers fall back to
/// offset 0.
pub fn first_partition_offset(mmls_output: &[u8]) -> Option<u64> {
    let text = String::from_utf8_lossy(mmls_output);

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || !fields[0].ends_with(':') {
            continue;
        }

        let description = fields[4..].join(" ");
        if description.contains("Unallocated")
            || description.contains("Meta")
            || description.contains("Table")
        {
            continue;
        }

        // fields: index, slot, start, end, length, description...
        if let Ok(start) = fields[2].parse::<u64>() {
            if start > 0 {
                return Some(start);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_fsstat_args_with_and_without_offset() {
        let image = PathBuf::from("disk.img");
        assert_eq!(fsstat_args(&image, None), vec!["disk.img"]);
        assert_eq!(
            fsstat_args(&image, Some(63)),
            vec!["-o", "63", "disk.img"]
        );
        // Offset zero means whole-image analysis; no flag is passed.
        assert_eq!(fsstat_args(&image, Some(0)), vec!["disk.img"]);
    }

    #[test]
    fn test_fls_args_recursion_flag() {
        let image = PathBuf::from("disk.img");
        assert_eq!(
            fls_args(&image, Some(2048), true),
            vec!["-r", "-o", "2048", "disk.img"]
        );
        assert_eq!(fls_args(&image, None, false), vec!["disk.img"]);
    }

    #[test]
    fn test_bodyfile_and_mactime_args() {
        let image = PathBuf::from("disk.img");
        assert_eq!(
            fls_bodyfile_args(&image, Some(63)),
            vec!["-m", "/", "-r", "-o", "63", "disk.img"]
        );
        assert_eq!(
            mactime_args(Path::new("reports/disk/timeline.body")),
            vec!["-b", "reports/disk/timeline.body"]
        );
    }

    #[test]
    fn test_icat_args() {
        let image = PathBuf::from("disk.img");
        assert_eq!(
            icat_args(&image, Some(63), 128),
            vec!["-o", "63", "disk.img", "128"]
        );
    }

    #[test]
    fn test_dd_args_are_a_vector() {
        let args = dd_args(Path::new("/dev/sdb"), Path::new("evidence/disk.img"), "4M");
        assert_eq!(
            args,
            vec![
                "if=/dev/sdb",
                "of=evidence/disk.img",
                "bs=4M",
                "conv=sync,noerror"
            ]
        );
    }

    #[test]
    fn test_first_partition_offset_dos_table() {
        let output = b"DOS Partition Table\n\
Offset Sector: 0\n\
Units are in 512-byte sectors\n\
\n\
      Slot      Start        End          Length       Description\n\
000:  Meta      0000000000   0000000000   0000000001   Primary Table (#0)\n\
001:  -------   0000000000   0000000062   0000000063   Unallocated\n\
002:  000:000   0000000063   0000096389   0000096327   NTFS (0x07)\n\
003:  000:001   0000096390   0000208844   0000112455   Linux (0x83)\n";

        assert_eq!(first_partition_offset(output), Some(63));
    }

    #[test]
    fn test_first_partition_offset_no_partitions() {
        let output = b"Cannot determine partition type\n";
        assert_eq!(first_partition_offset(output), None);

        let only_meta = b"000:  Meta      0000000000   0000000000   0000000001   Primary Table (#0)\n\
001:  -------   0000000000   0000000062   0000000063   Unallocated\n";
        assert_eq!(first_partition_offset(only_meta), None);
    }
}
