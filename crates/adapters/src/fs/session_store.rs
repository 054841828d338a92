use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use stepshot_application::{ApplicationError, SessionCatalog, SessionStore, SkippedRecord};
use stepshot_domain::{RasterImage, Session, SessionId};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::raster::{read_png, write_png};

const RECORD_EXTENSION: &str = "json";
const DELETING_SUFFIX: &str = "deleting";

/// Sessions as `<root>/<id>.json` records, with each session's capture
/// images under `<root>/<id>/`.
#[derive(Debug, Clone)]
pub struct JsonSessionStore {
    root: PathBuf,
}

impl JsonSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    pub fn images_dir(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn ensure_root(&self) -> Result<(), ApplicationError> {
        fs::create_dir_all(&self.root).map_err(|error| io_error(&self.root, error))
    }
}

impl SessionStore for JsonSessionStore {
    fn create(
        &self,
        name: &str,
        description: &str,
        start_time: &str,
    ) -> Result<Session, ApplicationError> {
        self.ensure_root()?;
        let id = SessionId::new(Uuid::new_v4().to_string())?;
        let session = Session::new(id, name, description, start_time)?;

        let images = self.images_dir(session.id());
        if self.record_path(session.id()).exists() || images.exists() {
            return Err(ApplicationError::Conflict(format!(
                "session id {} is already in use",
                session.id()
            )));
        }
        fs::create_dir(&images).map_err(|error| io_error(&images, error))?;
        debug!(path = %images.display(), "session image directory created");
        Ok(session)
    }

    fn load_all(&self) -> Result<SessionCatalog, ApplicationError> {
        let mut catalog = SessionCatalog::default();
        if !self.root.is_dir() {
            return Ok(catalog);
        }

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    let path = error.path().map(Path::to_path_buf).unwrap_or_default();
                    skip(&mut catalog, path, error.to_string());
                    continue;
                }
            };
            let path = entry.path();
            let is_record = entry.file_type().is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION);
            if !is_record {
                continue;
            }
            match read_record(path) {
                Ok(session) => catalog.sessions.push(session),
                Err(reason) => skip(&mut catalog, path.to_path_buf(), reason),
            }
        }

        catalog.sessions.sort_by(|a, b| {
            b.start_time()
                .cmp(a.start_time())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(catalog)
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>, ApplicationError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some).map_err(ApplicationError::Decode)
    }

    fn save(&self, session: &Session) -> Result<(), ApplicationError> {
        session.validate()?;
        self.ensure_root()?;
        let json = serde_json::to_string_pretty(session)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        let path = self.record_path(session.id());
        let tmp = path.with_extension(format!("{RECORD_EXTENSION}.tmp"));
        if let Err(error) = write_synced(&tmp, json.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(&tmp, error));
        }
        if let Err(error) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(ApplicationError::Persistence(format!(
                "{}: {error}",
                path.display()
            )));
        }
        debug!(path = %path.display(), captures = session.captures().len(), "session saved");
        Ok(())
    }

    /// The record is renamed out of the catalog before the images go, so a
    /// failure part way never leaves a listed session without its files.
    /// Deleting again finishes an interrupted delete.
    fn delete(&self, id: &SessionId) -> Result<(), ApplicationError> {
        let record = self.record_path(id);
        let doomed = staged_path(&record);
        let images = self.images_dir(id);
        if !record.exists() && !doomed.exists() && !images.exists() {
            return Err(ApplicationError::NotFound(format!("session {id}")));
        }
        if record.exists() {
            fs::rename(&record, &doomed).map_err(|error| io_error(&record, error))?;
        }
        if images.exists() {
            fs::remove_dir_all(&images).map_err(|error| io_error(&images, error))?;
        }
        if doomed.exists() {
            fs::remove_file(&doomed).map_err(|error| io_error(&doomed, error))?;
        }
        debug!(session = %id, "session files removed");
        Ok(())
    }

    fn write_capture_image(
        &self,
        id: &SessionId,
        file_stem: &str,
        image: &RasterImage,
    ) -> Result<String, ApplicationError> {
        let dir = self.images_dir(id);
        fs::create_dir_all(&dir).map_err(|error| io_error(&dir, error))?;

        let mut path = dir.join(format!("{file_stem}.png"));
        let mut suffix = 1;
        while path.exists() {
            path = dir.join(format!("{file_stem}_{suffix}.png"));
            suffix += 1;
        }
        write_atomically(&path, image)?;
        debug!(path = %path.display(), "capture image written");
        Ok(path.to_string_lossy().into_owned())
    }

    fn overwrite_image(&self, path: &str, image: &RasterImage) -> Result<(), ApplicationError> {
        write_atomically(Path::new(path), image)
    }

    fn read_image(&self, path: &str) -> Result<RasterImage, ApplicationError> {
        read_png(Path::new(path))
    }

    fn remove_image(&self, path: &str) -> Result<bool, ApplicationError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(io_error(Path::new(path), error)),
        }
    }

    fn stage_image_removal(&self, path: &str) -> Result<Option<String>, ApplicationError> {
        let staged = staged_path(Path::new(path));
        match fs::rename(path, &staged) {
            Ok(()) => Ok(Some(staged.to_string_lossy().into_owned())),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(Path::new(path), error)),
        }
    }

    fn restore_staged_image(&self, staged: &str, path: &str) -> Result<(), ApplicationError> {
        fs::rename(staged, path).map_err(|error| io_error(Path::new(staged), error))
    }

    fn copy_image(&self, path: &str, destination: &Path) -> Result<(), ApplicationError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|error| io_error(parent, error))?;
        }
        fs::copy(path, destination).map_err(|error| io_error(Path::new(path), error))?;
        Ok(())
    }

    fn discard_images_dir(&self, id: &SessionId) -> Result<(), ApplicationError> {
        let images = self.images_dir(id);
        match fs::remove_dir_all(&images) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&images, error)),
        }
    }
}

fn read_record(path: &Path) -> Result<Session, String> {
    let text = fs::read_to_string(path).map_err(|error| error.to_string())?;
    let session: Session = serde_json::from_str(&text).map_err(|error| error.to_string())?;
    session.validate().map_err(|error| error.to_string())?;
    let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
    if session.id().as_str() != stem {
        return Err(format!(
            "record id {} does not match file name {stem}",
            session.id()
        ));
    }
    Ok(session)
}

fn skip(catalog: &mut SessionCatalog, path: PathBuf, reason: String) {
    warn!(path = %path.display(), reason = %reason, "skipping unreadable session record");
    catalog.skipped.push(SkippedRecord { path, reason });
}

fn write_atomically(path: &Path, image: &RasterImage) -> Result<(), ApplicationError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    write_png(&tmp, image)?;
    fs::rename(&tmp, path).map_err(|error| {
        let _ = fs::remove_file(&tmp);
        io_error(path, error)
    })
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn staged_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(format!(".{DELETING_SUFFIX}"));
    PathBuf::from(staged)
}

fn io_error(path: &Path, error: std::io::Error) -> ApplicationError {
    ApplicationError::Io(format!("{}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, JsonSessionStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = JsonSessionStore::new(dir.path().join("sessions"));
        (dir, store)
    }

    fn image() -> RasterImage {
        RasterImage::filled(3, 2, [9, 8, 7, 255])
    }

    fn record_json(id: &str, start: &str, captures: &str) -> String {
        format!(
            r#"{{"id":"{id}","name":"Demo","description":"","start_time":"{start}",
                "end_time":"","duration":0,"captures":{captures}}}"#
        )
    }

    #[test]
    fn create_reserves_image_dir_without_persisting() {
        let (_dir, store) = store();
        let session = store.create("Demo", "desc", "2026-10-16 09:00:00").expect("create");

        assert!(store.images_dir(session.id()).is_dir());
        assert!(!store.record_path(session.id()).exists());
        assert!(store.load_all().expect("load").sessions.is_empty());
        assert_eq!(session.description(), "desc");
    }

    #[test]
    fn save_then_load_all_round_trips() {
        let (_dir, store) = store();
        let mut session = store.create("Demo", "", "2026-10-16 09:00:00").expect("create");
        let path = store
            .write_capture_image(session.id(), "capture_20261016_090001", &image())
            .expect("write");
        session.append_capture("2026-10-16 09:00:01", "", path);
        session.finish("2026-10-16 09:00:30", 30);
        store.save(&session).expect("save");

        let catalog = store.load_all().expect("load");
        assert!(catalog.skipped.is_empty());
        assert_eq!(catalog.sessions, vec![session.clone()]);
        assert_eq!(
            store.load(session.id()).expect("load one"),
            Some(session.clone())
        );

        let leftovers: Vec<_> = fs::read_dir(store.root())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn synced_write_replaces_previous_contents() {
        let (dir, _store) = store();
        let path = dir.path().join("record.json.tmp");
        fs::write(&path, "a much longer previous body").expect("seed");
        write_synced(&path, b"{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
    }

    #[test]
    fn load_all_skips_bad_records_and_keeps_good_ones() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root()).expect("root");
        let root = store.root();
        fs::write(root.join("good.json"), record_json("good", "2026-10-16 09:00:00", "[]"))
            .expect("good");
        fs::write(root.join("broken.json"), "{ not json").expect("broken");
        fs::write(
            root.join("nocaptures.json"),
            r#"{"id":"nocaptures","name":"Demo","description":"","start_time":"t","end_time":"","duration":0}"#,
        )
        .expect("no captures");
        fs::write(
            root.join("renamed.json"),
            record_json("other", "2026-10-16 09:00:00", "[]"),
        )
        .expect("renamed");
        fs::write(
            root.join("gap.json"),
            record_json(
                "gap",
                "t",
                r#"[{"id":2,"time":"t","description":"d","image_path":"p"}]"#,
            ),
        )
        .expect("gap");
        fs::write(root.join("notes.txt"), "ignored").expect("notes");

        let catalog = store.load_all().expect("load");
        let ids: Vec<&str> = catalog.sessions.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec!["good"]);
        assert_eq!(catalog.skipped.len(), 4);
    }

    #[test]
    fn load_all_orders_newest_first_then_by_id() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root()).expect("root");
        for (id, start) in [
            ("b", "2026-10-15 08:00:00"),
            ("c", "2026-10-16 08:00:00"),
            ("a", "2026-10-15 08:00:00"),
        ] {
            fs::write(
                store.root().join(format!("{id}.json")),
                record_json(id, start, "[]"),
            )
            .expect("write");
        }
        let ids: Vec<String> = store
            .load_all()
            .expect("load")
            .sessions
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn missing_root_is_an_empty_catalog() {
        let (_dir, store) = store();
        let catalog = store.load_all().expect("load");
        assert!(catalog.sessions.is_empty());
        assert!(catalog.skipped.is_empty());
    }

    #[test]
    fn load_of_corrupt_record_is_decode_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root()).expect("root");
        fs::write(store.root().join("bad.json"), "[]").expect("write");
        let id = SessionId::new("bad").expect("id");
        assert!(matches!(store.load(&id), Err(ApplicationError::Decode(_))));
        let unknown = SessionId::new("unknown").expect("id");
        assert!(store.load(&unknown).expect("load").is_none());
    }

    #[test]
    fn delete_removes_record_and_images() {
        let (_dir, store) = store();
        let mut session = store.create("Demo", "", "t").expect("create");
        let path = store
            .write_capture_image(session.id(), "capture", &image())
            .expect("write");
        session.append_capture("t", "", path);
        store.save(&session).expect("save");

        store.delete(session.id()).expect("delete");
        assert!(!store.images_dir(session.id()).exists());
        assert!(!store.record_path(session.id()).exists());
        assert!(matches!(
            store.delete(session.id()),
            Err(ApplicationError::NotFound(_))
        ));
    }

    #[test]
    fn delete_finishes_after_record_was_already_set_aside() {
        let (_dir, store) = store();
        let mut session = store.create("Demo", "", "t").expect("create");
        let path = store
            .write_capture_image(session.id(), "capture", &image())
            .expect("write");
        session.append_capture("t", "", path);
        store.save(&session).expect("save");

        let record = store.record_path(session.id());
        let doomed = staged_path(&record);
        fs::rename(&record, &doomed).expect("set aside");
        assert!(store.load_all().expect("load").sessions.is_empty());

        store.delete(session.id()).expect("delete");
        assert!(!doomed.exists());
        assert!(!store.images_dir(session.id()).exists());
        assert_eq!(fs::read_dir(store.root()).expect("read dir").count(), 0);
    }

    #[test]
    fn staged_image_can_be_restored_or_purged() {
        let (_dir, store) = store();
        let session = store.create("Demo", "", "t").expect("create");
        let path = store
            .write_capture_image(session.id(), "capture", &image())
            .expect("write");

        let staged = store
            .stage_image_removal(&path)
            .expect("stage")
            .expect("file existed");
        assert!(staged.ends_with(".png.deleting"));
        assert!(!Path::new(&path).exists());
        store.restore_staged_image(&staged, &path).expect("restore");
        assert_eq!(store.read_image(&path).expect("read"), image());

        let staged = store
            .stage_image_removal(&path)
            .expect("stage")
            .expect("file existed");
        assert!(store.remove_image(&staged).expect("purge"));
        assert!(store.stage_image_removal(&path).expect("stage").is_none());
    }

    #[test]
    fn capture_images_get_unique_names() {
        let (_dir, store) = store();
        let session = store.create("Demo", "", "t").expect("create");
        let first = store
            .write_capture_image(session.id(), "capture_x", &image())
            .expect("first");
        let second = store
            .write_capture_image(session.id(), "capture_x", &image())
            .expect("second");
        assert_ne!(first, second);
        assert!(second.ends_with("capture_x_1.png"));
        assert_eq!(store.read_image(&second).expect("read"), image());
    }

    #[test]
    fn removing_missing_image_reports_false() {
        let (_dir, store) = store();
        let session = store.create("Demo", "", "t").expect("create");
        let path = store
            .write_capture_image(session.id(), "capture", &image())
            .expect("write");
        assert!(store.remove_image(&path).expect("remove"));
        assert!(!store.remove_image(&path).expect("remove again"));
    }

    #[test]
    fn discard_images_dir_tolerates_missing_directory() {
        let (_dir, store) = store();
        let session = store.create("Demo", "", "t").expect("create");
        store.discard_images_dir(session.id()).expect("discard");
        assert!(!store.images_dir(session.id()).exists());
        store.discard_images_dir(session.id()).expect("discard again");
    }

    #[test]
    fn overwrite_replaces_in_place() {
        let (_dir, store) = store();
        let session = store.create("Demo", "", "t").expect("create");
        let path = store
            .write_capture_image(session.id(), "capture", &image())
            .expect("write");
        let replacement = RasterImage::filled(1, 1, [0, 0, 0, 255]);
        store.overwrite_image(&path, &replacement).expect("overwrite");
        assert_eq!(store.read_image(&path).expect("read"), replacement);
    }
}
