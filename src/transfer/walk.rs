// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Local directory discovery and local-to-remote path mapping.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Entries of `dir` sorted by file name.
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| Error::local_io(dir, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::local_io(dir, e))?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// Every directory below `root` (excluding `root`), depth-first.
///
/// Symbolic links are not followed, so a link to a directory is not
/// reported and cannot cause a cycle.
pub fn collect_directories(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(root, &mut found)?;
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in sorted_entries(dir)? {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::local_io(&path, e))?;
        if file_type.is_dir() {
            found.push(path.clone());
            walk(&path, found)?;
        }
    }
    Ok(())
}

/// Directories that are not an ancestor of any other directory in `dirs`.
///
/// Ancestry is decided on whole path components, so `a/b` is not an
/// ancestor of `a/bc`.
pub fn deepest_directories(dirs: &[PathBuf]) -> Vec<PathBuf> {
    dirs.iter()
        .filter(|candidate| {
            !dirs
                .iter()
                .any(|other| other != *candidate && other.starts_with(candidate))
        })
        .cloned()
        .collect()
}

/// Join a remote directory and a relative name with `/`.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Remote counterpart of `local`, a path somewhere below `local_root`.
pub fn remote_path_for(local_root: &Path, local: &Path, remote_root: &str) -> Result<String> {
    let relative = local.strip_prefix(local_root).map_err(|_| {
        Error::InvalidArgument(format!("{local:?} is not below {local_root:?}"))
    })?;

    let mut remote = remote_root.to_string();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                remote = join_remote(&remote, &name.to_string_lossy());
            }
            Component::CurDir => {}
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unexpected path component {other:?} in {local:?}"
                )))
            }
        }
    }
    Ok(remote)
}

/// Parent directory of a remote path, if it has one worth creating.
pub fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}

/// Final component of a remote or local path.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(dirs: &[&str], files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        for file in files {
            fs::write(temp.path().join(file), "x").unwrap();
        }
        temp
    }

    #[test]
    fn test_collect_directories_depth_first() {
        let temp = tree(&["a/b/c", "a/d", "e"], &["a/f.txt", "g.txt"]);
        let root = temp.path();
        let dirs = collect_directories(root).unwrap();
        let expected: Vec<PathBuf> = ["a", "a/b", "a/b/c", "a/d", "e"]
            .iter()
            .map(|d| root.join(d))
            .collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn test_collect_directories_empty() {
        let temp = tree(&[], &["only.txt"]);
        assert!(collect_directories(temp.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_directories_skips_symlinked_dirs() {
        let temp = tree(&["real"], &[]);
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();
        let dirs = collect_directories(temp.path()).unwrap();
        assert_eq!(dirs, vec![temp.path().join("real")]);
    }

    #[test]
    fn test_deepest_directories() {
        let dirs: Vec<PathBuf> = ["/s/a", "/s/a/b", "/s/a/b/c", "/s/a/d", "/s/e"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let deepest = deepest_directories(&dirs);
        let expected: Vec<PathBuf> = ["/s/a/b/c", "/s/a/d", "/s/e"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(deepest, expected);
    }

    #[test]
    fn test_deepest_directories_component_wise() {
        let dirs: Vec<PathBuf> = ["/s/a/b", "/s/a/bc"].iter().map(PathBuf::from).collect();
        assert_eq!(deepest_directories(&dirs), dirs);
    }

    #[test]
    fn test_remote_path_for() {
        let root = Path::new("/local/stacks");
        assert_eq!(
            remote_path_for(root, Path::new("/local/stacks/sub/b.txt"), "/srv/app").unwrap(),
            "/srv/app/sub/b.txt"
        );
        assert_eq!(
            remote_path_for(root, Path::new("/local/stacks"), "/srv/app/").unwrap(),
            "/srv/app/"
        );
        assert!(remote_path_for(root, Path::new("/elsewhere/x"), "/srv").is_err());
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("/srv", "a"), "/srv/a");
        assert_eq!(join_remote("/srv/", "a"), "/srv/a");
        assert_eq!(join_remote("", "a"), "a");
    }

    #[test]
    fn test_remote_parent() {
        assert_eq!(remote_parent("/etc/app/local.conf"), Some("/etc/app"));
        assert_eq!(remote_parent("/etc/app/"), Some("/etc"));
        assert_eq!(remote_parent("/file"), None);
        assert_eq!(remote_parent("file"), None);
        assert_eq!(remote_parent("dir/file"), Some("dir"));
    }
}
