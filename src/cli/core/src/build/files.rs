/* src/cli/core/src/build/files.rs */

// File-system steps of the adapter pipeline: reset, copy, compress, digest.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use super::types::BundlePaths;

const COMPRESSIBLE: &[&str] =
  &["html", "css", "js", "mjs", "json", "svg", "txt", "xml", "map", "wasm"];
const MIN_COMPRESS_SIZE: u64 = 1024;

/// Resolve `.` and `..` components without touching the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          out.push(component);
        }
      }
      other => out.push(other),
    }
  }
  out
}

/// Check that `dir` is strictly inside `project_root`; returns the normalized path.
/// Every generated directory goes through this before it is deleted.
pub fn ensure_inside_project(project_root: &Path, dir: &Path) -> Result<PathBuf> {
  let root = normalize_path(project_root);
  let target = normalize_path(dir);
  if !target.starts_with(&root) || target == root {
    bail!("refusing to remove {} (must be inside the project {})", dir.display(), root.display());
  }
  Ok(target)
}

/// Delete a generated directory inside the project; missing directories are fine.
pub fn remove_generated_dir(project_root: &Path, dir: &Path) -> Result<bool> {
  let target = ensure_inside_project(project_root, dir)?;
  if !target.exists() {
    return Ok(false);
  }
  std::fs::remove_dir_all(&target)
    .with_context(|| format!("failed to remove {}", target.display()))?;
  Ok(true)
}

/// Delete the whole bundle directory and recreate its skeleton.
/// Refuses to touch the project root itself or anything outside it.
pub fn reset_bundle(
  project_root: &Path,
  paths: &BundlePaths,
  with_prerendered: bool,
) -> Result<()> {
  remove_generated_dir(project_root, &paths.root)?;
  let mut dirs = vec![&paths.server, &paths.static_dir];
  if with_prerendered {
    dirs.push(&paths.prerendered);
  }
  for dir in dirs {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
  }
  Ok(())
}

/// Sorted relative paths of every regular file under `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  if !dir.exists() {
    return Ok(files);
  }
  for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
    let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
    if entry.file_type().is_file() {
      let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
      files.push(rel.to_path_buf());
    }
  }
  Ok(files)
}

/// Copy `src` into `dst` verbatim; returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
  let files = list_files(src)?;
  for rel in &files {
    let from = src.join(rel);
    let to = dst.join(rel);
    if let Some(parent) = to.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::copy(&from, &to)
      .with_context(|| format!("failed to copy {} -> {}", from.display(), to.display()))?;
  }
  Ok(files.len())
}

/// Copy `src` into `dst` when it exists; missing sources copy nothing.
pub fn copy_tree_if_exists(src: &Path, dst: &Path) -> Result<usize> {
  if src.is_dir() { copy_tree(src, dst) } else { Ok(0) }
}

fn is_compressible(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|ext| COMPRESSIBLE.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Write `<file>.gz` next to every eligible file under `dir`. Output is byte-stable across runs.
pub fn precompress(dir: &Path) -> Result<usize> {
  let mut count = 0;
  for rel in list_files(dir)? {
    let path = dir.join(&rel);
    if !is_compressible(&path) {
      continue;
    }
    let size = std::fs::metadata(&path)?.len();
    if size < MIN_COMPRESS_SIZE {
      continue;
    }
    let mut gz_name = path.clone().into_os_string();
    gz_name.push(".gz");
    gzip_file(&path, Path::new(&gz_name))?;
    count += 1;
  }
  Ok(count)
}

fn gzip_file(src: &Path, dst: &Path) -> Result<()> {
  let mut input = BufReader::new(
    File::open(src).with_context(|| format!("failed to open {}", src.display()))?,
  );
  let output = BufWriter::new(
    File::create(dst).with_context(|| format!("failed to create {}", dst.display()))?,
  );
  // GzEncoder writes a zero mtime, so repeated builds produce identical archives
  let mut encoder = GzEncoder::new(output, Compression::best());
  let mut buf = Vec::new();
  input.read_to_end(&mut buf)?;
  encoder.write_all(&buf)?;
  encoder.finish()?.flush()?;
  Ok(())
}

/// Hex sha256 over the sorted relative paths and contents of `dir`.
pub fn digest_dir(dir: &Path) -> Result<String> {
  let mut hasher = Sha256::new();
  for rel in list_files(dir)? {
    hasher.update(rel.to_string_lossy().as_bytes());
    hasher.update([0]);
    let content = std::fs::read(dir.join(&rel))
      .with_context(|| format!("failed to read {}", dir.join(&rel).display()))?;
    hasher.update(&content);
  }
  Ok(hex::encode(hasher.finalize()))
}

pub fn dir_size(dir: &Path) -> Result<u64> {
  let mut total = 0;
  for rel in list_files(dir)? {
    total += std::fs::metadata(dir.join(rel))?.len();
  }
  Ok(total)
}

/// URL path for a file relative to an asset root (`about/index.html` -> `/about`).
pub fn prerendered_route(rel: &Path) -> String {
  let s = rel.to_string_lossy().replace('\\', "/");
  let s = s.strip_suffix(".html").unwrap_or(&s);
  let s = s.strip_suffix("/index").or_else(|| (s == "index").then_some("")).unwrap_or(s);
  format!("/{s}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reset_recreates_skeleton() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = BundlePaths::new(tmp.path().join(".nucel/output"));
    std::fs::create_dir_all(paths.server.join("stale")).unwrap();
    std::fs::write(paths.root.join("metadata.json"), "{}").unwrap();

    reset_bundle(tmp.path(), &paths, false).unwrap();
    assert!(paths.server.is_dir());
    assert!(paths.static_dir.is_dir());
    assert!(!paths.prerendered.exists());
    assert!(!paths.server.join("stale").exists());
    assert!(!paths.metadata().exists());
  }

  #[test]
  fn reset_refuses_project_root() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = BundlePaths::new(tmp.path());
    assert!(reset_bundle(tmp.path(), &paths, false).is_err());
    let outside = BundlePaths::new(std::env::temp_dir().join("nucel-elsewhere"));
    assert!(reset_bundle(tmp.path(), &outside, false).is_err());
  }

  #[test]
  fn reset_refuses_parent_of_project() {
    let outer = tempfile::tempdir().unwrap();
    let project = outer.path().join("proj");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(outer.path().join("sibling.txt"), "keep").unwrap();

    let paths = BundlePaths::new(project.join(".."));
    let err = reset_bundle(&project, &paths, false).unwrap_err();
    assert!(err.to_string().contains("must be inside the project"));
    assert!(outer.path().join("sibling.txt").exists());

    let dotted = BundlePaths::new(project.join("out/../.."));
    assert!(reset_bundle(&project, &dotted, false).is_err());
    assert!(project.exists());
  }

  #[test]
  fn normalizes_dot_components() {
    assert_eq!(normalize_path(Path::new("/p/./a/../b")), PathBuf::from("/p/b"));
    assert_eq!(normalize_path(Path::new("/p/..")), PathBuf::from("/"));
    assert!(ensure_inside_project(Path::new("/p"), Path::new("/p/.")).is_err());
    assert_eq!(
      ensure_inside_project(Path::new("/p"), Path::new("/p/./.nucel/output")).unwrap(),
      PathBuf::from("/p/.nucel/output")
    );
  }

  #[test]
  fn copy_tree_is_sorted_and_verbatim() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(src.join("b")).unwrap();
    std::fs::write(src.join("b/z.txt"), "z").unwrap();
    std::fs::write(src.join("a.txt"), "a").unwrap();
    let dst = tmp.path().join("dst");

    assert_eq!(copy_tree(&src, &dst).unwrap(), 2);
    assert_eq!(std::fs::read_to_string(dst.join("b/z.txt")).unwrap(), "z");
    assert_eq!(list_files(&dst).unwrap(), vec![PathBuf::from("a.txt"), PathBuf::from("b/z.txt")]);
    assert_eq!(copy_tree_if_exists(&tmp.path().join("missing"), &dst).unwrap(), 0);
  }

  #[test]
  fn precompress_is_deterministic_and_selective() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("app.js"), "console.log(1);\n".repeat(200)).unwrap();
    std::fs::write(dir.join("tiny.css"), "a{}").unwrap();
    std::fs::write(dir.join("logo.png"), vec![0u8; 4096]).unwrap();

    assert_eq!(precompress(dir).unwrap(), 1);
    let first = std::fs::read(dir.join("app.js.gz")).unwrap();
    assert!(!dir.join("tiny.css.gz").exists());
    assert!(!dir.join("logo.png.gz").exists());

    std::fs::remove_file(dir.join("app.js.gz")).unwrap();
    precompress(dir).unwrap();
    assert_eq!(std::fs::read(dir.join("app.js.gz")).unwrap(), first);
  }

  #[test]
  fn digest_changes_with_content() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("index.mjs"), "a").unwrap();
    let before = digest_dir(tmp.path()).unwrap();
    assert_eq!(before, digest_dir(tmp.path()).unwrap());
    std::fs::write(tmp.path().join("index.mjs"), "b").unwrap();
    assert_ne!(before, digest_dir(tmp.path()).unwrap());
  }

  #[test]
  fn prerendered_routes() {
    assert_eq!(prerendered_route(Path::new("index.html")), "/");
    assert_eq!(prerendered_route(Path::new("about/index.html")), "/about");
    assert_eq!(prerendered_route(Path::new("blog/post.html")), "/blog/post");
  }
}
