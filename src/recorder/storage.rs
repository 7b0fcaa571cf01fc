use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::AppError;
use crate::result::Result;
use crate::utils;

/// Maps a client path onto the record root. The leading `/` is dropped,
/// `..` is refused so nothing escapes the root. Returns the file system path
/// and the normalized client path.
pub fn resolve(root: &Path, path: &str) -> Result<(PathBuf, String)> {
    let mut resolved = root.to_path_buf();
    let mut parts = vec![];
    for component in Path::new(path.trim()).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                parts.push(part.to_string_lossy().into_owned());
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(AppError::bad_request(format!("invalid path: {}", path)));
            }
        }
    }
    Ok((resolved, format!("/{}", parts.join("/"))))
}

/// Creates (or truncates) a record file along with its parent directories.
/// A path naming a directory, or running through a file, is a bad request.
pub async fn create(file: &Path) -> Result<fs::File> {
    if let Ok(meta) = fs::metadata(file).await {
        if meta.is_dir() {
            return Err(AppError::bad_request(format!(
                "{} is a directory",
                file.display()
            )));
        }
    }
    if let Some(dir) = file.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            // The nearest existing ancestor tells a bad path from a broken disk
            for ancestor in dir.ancestors() {
                if let Ok(meta) = fs::metadata(ancestor).await {
                    if !meta.is_dir() {
                        return Err(AppError::bad_request(format!(
                            "{} is not a directory",
                            ancestor.display()
                        )));
                    }
                    break;
                }
            }
            return Err(e.into());
        }
    }
    Ok(fs::File::create(file).await?)
}

/// Every directory below `root`, as `/a`, `/a/b`, sorted
pub async fn folders(root: &Path) -> Result<Vec<String>> {
    let mut folders = vec![];
    let mut pending = vec![(root.to_path_buf(), String::new())];
    while let Some((dir, prefix)) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                let folder = format!("{}/{}", prefix, entry.file_name().to_string_lossy());
                pending.push((entry.path(), folder.clone()));
                folders.push(folder);
            }
        }
    }
    folders.sort();
    Ok(folders)
}

/// Regular files directly inside `folder`, sorted by name
pub async fn files(root: &Path, folder: &str) -> Result<api::response::RecordFiles> {
    let (dir, folder) = resolve(root, folder)?;
    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found(format!("folder {} not found", folder)))
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push(api::response::RecordFile {
            path: format!("{}/{}", folder.trim_end_matches('/'), name),
            name,
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .map(|t| utils::date_time(chrono::DateTime::<chrono::Utc>::from(t)))
                .unwrap_or_default(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(api::response::RecordFiles { folder, files })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let root = Path::new("/data");
        let (path, display) = resolve(root, "/rec/cam1.mp4").unwrap();
        assert_eq!(path, PathBuf::from("/data/rec/cam1.mp4"));
        assert_eq!(display, "/rec/cam1.mp4");

        let (path, display) = resolve(root, "rec/./cam1.mp4").unwrap();
        assert_eq!(path, PathBuf::from("/data/rec/cam1.mp4"));
        assert_eq!(display, "/rec/cam1.mp4");

        let (path, display) = resolve(root, "/").unwrap();
        assert_eq!(path, PathBuf::from("/data"));
        assert_eq!(display, "/");

        assert!(matches!(
            resolve(root, "/rec/../../etc/passwd"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_folders_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("rec/day1")).unwrap();
        std::fs::create_dir_all(root.join("other")).unwrap();
        std::fs::write(root.join("rec/b.mp4"), b"12345").unwrap();
        std::fs::write(root.join("rec/a.mp4"), b"1").unwrap();

        assert_eq!(
            folders(root).await.unwrap(),
            vec!["/other", "/rec", "/rec/day1"]
        );

        let listing = files(root, "/rec").await.unwrap();
        assert_eq!(listing.folder, "/rec");
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
        assert_eq!(listing.files[1].size, 5);
        assert_eq!(listing.files[1].path, "/rec/b.mp4");

        assert!(matches!(
            files(root, "/missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(folders(&root.join("nothing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        create(&root.join("rec/day1/a.ts")).await.unwrap();
        assert!(root.join("rec/day1/a.ts").is_file());

        std::fs::write(root.join("rec/b.ts"), b"old").unwrap();
        create(&root.join("rec/b.ts")).await.unwrap();
        assert!(std::fs::read(root.join("rec/b.ts")).unwrap().is_empty());

        for file in ["rec", "rec/day1", "rec/b.ts/c.ts", "rec/b.ts/x/c.ts"] {
            assert!(
                matches!(create(&root.join(file)).await, Err(AppError::BadRequest(_))),
                "{}",
                file
            );
        }
    }
}
