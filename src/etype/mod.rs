//! # EType Index
//!
//! Groups the concrete model-library variants under their mtype.
//!
//! Variant directories are named `Layer_Class_Etype_Variant`, e.g.
//! `L1_DAC_bNAC219_1`; the first two segments (`L1_DAC`) are the mtype used
//! by the pathway statistics.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{Error, Result};

static VARIANT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^_]+_[^_]+)_([^_]+)_([^_]+)$").expect("static variant pattern")
});

/// Split a variant name into `(mtype, etype, variant)`.
pub fn parse_variant_name(name: &str) -> Option<(&str, &str, &str)> {
    let caps = VARIANT_NAME.captures(name)?;
    Some((
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str(),
        caps.get(3)?.as_str(),
    ))
}

/// mtype → sorted variant names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ETypeIndex {
    groups: BTreeMap<String, Vec<String>>,
}

impl ETypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk a model library and register every variant directory.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut index = Self::new();
        let mut skipped = 0usize;
        index.scan_dir(root, &mut skipped)?;
        info!(
            root = %root.display(),
            mtypes = index.groups.len(),
            variants = index.len(),
            skipped,
            "scanned model library"
        );
        Ok(index)
    }

    fn scan_dir(&mut self, dir: &Path, skipped: &mut usize) -> Result<()> {
        let mut subdirs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                subdirs.push(entry.path());
            }
        }
        subdirs.sort();

        for path in subdirs {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %path.display(), "skipping non UTF-8 directory name");
                *skipped += 1;
                continue;
            };
            if self.insert(name) {
                continue;
            }
            if has_subdirectory(&path)? {
                self.scan_dir(&path, skipped)?;
            } else {
                warn!(name, "directory name is not Layer_Class_Etype_Variant, skipping");
                *skipped += 1;
            }
        }
        Ok(())
    }

    /// Build from a list of names; names that do not parse are skipped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for name in names {
            let name = name.as_ref();
            if !index.insert(name) {
                warn!(name, "not a variant name, skipping");
            }
        }
        index
    }

    /// Register one variant name. Returns false if it does not parse.
    pub fn insert(&mut self, name: &str) -> bool {
        let Some((mtype, _, _)) = parse_variant_name(name) else {
            return false;
        };
        let group = self.groups.entry(mtype.to_owned()).or_default();
        if let Err(pos) = group.binary_search_by(|v| v.as_str().cmp(name)) {
            group.insert(pos, name.to_owned());
            debug!(mtype, variant = name, "registered variant");
        }
        true
    }

    /// Register an mtype with no variants yet.
    pub fn declare(&mut self, mtype: &str) {
        self.groups.entry(mtype.to_owned()).or_default();
    }

    pub fn variants(&self, mtype: &str) -> &[String] {
        self.groups.get(mtype).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mtypes(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Total number of variants across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uniform choice among the variants of `mtype`.
    pub fn pick_variant<R: Rng + ?Sized>(&self, mtype: &str, rng: &mut R) -> Result<&str> {
        let group = self.variants(mtype);
        if group.is_empty() {
            return Err(Error::NoVariantsForType { mtype: mtype.to_owned() });
        }
        Ok(group[rng.gen_range(0..group.len())].as_str())
    }
}

fn has_subdirectory(path: &Path) -> Result<bool> {
    for entry in std::fs::read_dir(path)? {
        if entry?.file_type()?.is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_parse_variant_name() {
        assert_eq!(
            parse_variant_name("L1_DAC_bNAC219_1"),
            Some(("L1_DAC", "bNAC219", "1")),
        );
        assert_eq!(parse_variant_name("L1_DAC"), None);
        assert_eq!(parse_variant_name("L1_DAC_bNAC219_1_extra"), None);
        assert_eq!(parse_variant_name("L1__bNAC219_1"), None);
    }

    #[test]
    fn test_from_names_groups_by_mtype() {
        let index = ETypeIndex::from_names([
            "L6_BP_bAC217_2",
            "L1_DAC_bNAC219_1",
            "L6_BP_bAC217_1",
            "global_mechanisms",
            "L6_BP_bAC217_1",
        ]);
        assert_eq!(index.variants("L6_BP"), ["L6_BP_bAC217_1", "L6_BP_bAC217_2"]);
        assert_eq!(index.variants("L1_DAC"), ["L1_DAC_bNAC219_1"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.mtypes().collect::<Vec<_>>(), vec!["L1_DAC", "L6_BP"]);
    }

    #[test]
    fn test_pick_variant_unknown_and_empty() {
        let mut index = ETypeIndex::from_names(["L1_DAC_bNAC219_1"]);
        index.declare("L23_PC");
        let mut rng = StdRng::seed_from_u64(7);

        assert!(matches!(
            index.pick_variant("L5_TTPC1", &mut rng),
            Err(Error::NoVariantsForType { ref mtype }) if mtype == "L5_TTPC1"
        ));
        assert!(matches!(
            index.pick_variant("L23_PC", &mut rng),
            Err(Error::NoVariantsForType { .. })
        ));
        assert_eq!(index.pick_variant("L1_DAC", &mut rng).unwrap(), "L1_DAC_bNAC219_1");
    }

    #[test]
    fn test_pick_variant_covers_group() {
        let index = ETypeIndex::from_names(["L6_BP_bAC217_1", "L6_BP_bAC217_2", "L6_BP_cNAC187_1"]);
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(index.pick_variant("L6_BP", &mut rng).unwrap().to_owned());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_scan_model_library() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for variant in ["L1_DAC_bNAC219_1", "L1_DAC_bNAC219_2", "L23_PC_cADpyr229_1"] {
            std::fs::create_dir_all(root.join(variant).join("morphology")).unwrap();
        }
        std::fs::create_dir_all(root.join("layer5").join("L5_TTPC1_cADpyr232_1")).unwrap();
        std::fs::create_dir_all(root.join("global_mechanisms")).unwrap();
        std::fs::write(root.join("L6_BP_bAC217_1"), "a file, not a directory").unwrap();

        let index = ETypeIndex::scan(root).unwrap();
        assert_eq!(index.variants("L1_DAC"), ["L1_DAC_bNAC219_1", "L1_DAC_bNAC219_2"]);
        assert_eq!(index.variants("L23_PC"), ["L23_PC_cADpyr229_1"]);
        assert_eq!(index.variants("L5_TTPC1"), ["L5_TTPC1_cADpyr232_1"]);
        assert!(index.variants("L6_BP").is_empty());
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_scan_missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ETypeIndex::scan(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
