//! Pairs base configuration files with the overlay for one build
//! configuration.
//!
//! A file named `Stem.Token.config` is a *follower* of `Stem.config` when
//! both sit in the same directory. Followers are never bases themselves, and
//! a base picks the first follower whose token equals the requested build
//! configuration.

use crate::app::diagnostics::Diagnostics;
use crate::app::models::ConfigurationEntry;
use pathdiff::diff_paths;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

const CONFIG_EXTENSION: &str = ".config";

/// A candidate file split into the pieces pairing cares about.
struct Candidate<'p> {
    path: &'p Path,
    name: &'p str,
    stem: &'p str,
}

/// Follower relations among the candidates of one directory.
struct Followers<'p> {
    /// Base stem to `(candidate index, token)`, in candidate order.
    by_stem: HashMap<&'p str, Vec<(usize, &'p str)>>,
    members: HashSet<usize>,
}

pub struct PairMatcher<'a> {
    build_configuration: &'a str,
    source_root: &'a Path,
    excluded: &'a HashSet<PathBuf>,
    log: Diagnostics<'a>,
}

impl<'a> PairMatcher<'a> {
    pub fn new(
        build_configuration: &'a str,
        source_root: &'a Path,
        excluded: &'a HashSet<PathBuf>,
        log: Diagnostics<'a>,
    ) -> Self {
        Self {
            build_configuration,
            source_root,
            excluded,
            log,
        }
    }

    /// Produces at most one entry per base file, ordered like the input.
    pub fn pair(&self, sorted_paths: &[PathBuf]) -> Vec<ConfigurationEntry> {
        let mut by_directory: BTreeMap<&Path, Vec<Candidate<'_>>> = BTreeMap::new();
        let mut order: Vec<(&Path, usize)> = Vec::new();

        for path in sorted_paths {
            let Some(candidate) = Candidate::from_path(path) else {
                self.log
                    .debug(format_args!("{} is not a configuration file", path.display()));
                continue;
            };
            let directory = path.parent().unwrap_or_else(|| Path::new(""));
            let group = by_directory.entry(directory).or_default();
            order.push((directory, group.len()));
            group.push(candidate);
        }

        let followers: BTreeMap<&Path, Followers<'_>> = by_directory
            .iter()
            .map(|(directory, siblings)| (*directory, Followers::index(siblings)))
            .collect();

        let mut entries = Vec::new();
        for (directory, index) in order {
            let siblings = &by_directory[directory];
            let followers = &followers[directory];
            if followers.members.contains(&index) {
                continue;
            }
            if let Some(entry) = self.pair_base(&siblings[index], siblings, followers) {
                entries.push(entry);
            }
        }
        entries
    }

    fn pair_base(
        &self,
        base: &Candidate<'_>,
        siblings: &[Candidate<'_>],
        followers: &Followers<'_>,
    ) -> Option<ConfigurationEntry> {
        self.log.debug(format_args!(
            "Transform pattern for {} is {}.<configuration>{}",
            base.path.display(),
            base.stem,
            CONFIG_EXTENSION
        ));

        let mut selected = None;
        for &(index, token) in followers.of(base.stem) {
            let follower = &siblings[index];
            if selected.is_some() {
                continue;
            }
            if self.is_requested(token) {
                self.log.debug(format_args!(
                    "{} matches the build configuration {}",
                    follower.name, self.build_configuration
                ));
                selected = Some(follower.path);
            } else {
                self.log.debug(format_args!(
                    "{} doesn't match the build configuration {}",
                    follower.name, self.build_configuration
                ));
            }
        }

        let transformation = selected?;
        if self.excluded.contains(base.path) {
            self.log.info(format_args!(
                "{} is in the exclusion list. Won't be processed",
                base.path.display()
            ));
            return None;
        }

        Some(ConfigurationEntry {
            file_path: base.path.to_path_buf(),
            file_name: base.name.to_string(),
            parent_subfolder: self.parent_subfolder(base.path),
            transformation_file_path: transformation.to_path_buf(),
        })
    }

    fn is_requested(&self, token: &str) -> bool {
        token.to_lowercase() == self.build_configuration.to_lowercase()
    }

    fn parent_subfolder(&self, path: &Path) -> PathBuf {
        let relative = path
            .parent()
            .and_then(|directory| diff_paths(directory, self.source_root));

        match relative {
            Some(relative) if !relative.starts_with("..") => {
                self.log.debug(format_args!(
                    "Parent subfolder for {} is {}",
                    path.display(),
                    relative.display()
                ));
                relative
            }
            _ => {
                self.log.error(format_args!(
                    "Can't get the directory of {} relative to {}",
                    path.display(),
                    self.source_root.display()
                ));
                PathBuf::new()
            }
        }
    }
}

impl<'p> Candidate<'p> {
    fn from_path(path: &'p Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = strip_config_extension(name)?;
        Some(Self { path, name, stem })
    }
}

impl<'p> Followers<'p> {
    fn index(siblings: &[Candidate<'p>]) -> Self {
        let stems: HashSet<&str> = siblings.iter().map(|c| c.stem).collect();
        let mut by_stem: HashMap<&'p str, Vec<(usize, &'p str)>> = HashMap::new();
        let mut members = HashSet::new();

        for (index, candidate) in siblings.iter().enumerate() {
            for (base_stem, token) in split_stems(candidate.stem) {
                if stems.contains(base_stem) {
                    by_stem.entry(base_stem).or_default().push((index, token));
                    members.insert(index);
                }
            }
        }
        Self { by_stem, members }
    }

    fn of(&self, stem: &str) -> &[(usize, &'p str)] {
        self.by_stem.get(stem).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Every way to read `stem` as `<base>.<token>` with a non-empty token.
fn split_stems(stem: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
    stem.match_indices('.')
        .map(move |(dot, _)| (&stem[..dot], &stem[dot + 1..]))
        .filter(|(_, token)| !token.is_empty())
}

fn strip_config_extension(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(CONFIG_EXTENSION.len())?;
    let suffix = name.get(split..)?;
    suffix
        .eq_ignore_ascii_case(CONFIG_EXTENSION)
        .then(|| &name[..split])
}
