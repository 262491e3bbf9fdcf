use super::*;
use crate::{logging, utils, Error};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Weak};
use std::time::SystemTime;

pub const DEFAULT_REFRESH_MS: u64 = 3000;

/// FileRefreshableDataSource polls a file on a background thread,
/// and pushes the converted content into its property whenever the file is modified.
pub struct FileRefreshableDataSource<T> {
    path: PathBuf,
    converter: Converter<T>,
    property: Arc<DynamicProperty<T>>,
    // (modified time, length) of the file at the last read
    last_modified: Mutex<Option<(SystemTime, u64)>>,
    closed: AtomicBool,
}

impl<T> FileRefreshableDataSource<T>
where
    T: Clone + PartialEq + Default + Send + Sync + 'static,
{
    pub fn new<P: Into<PathBuf>>(path: P, converter: Converter<T>) -> Result<Arc<Self>> {
        Self::with_refresh_ms(path, converter, DEFAULT_REFRESH_MS)
    }

    pub fn with_refresh_ms<P: Into<PathBuf>>(
        path: P,
        converter: Converter<T>,
        refresh_ms: u64,
    ) -> Result<Arc<Self>> {
        if refresh_ms == 0 {
            return Err(Error::msg("refresh_ms must be positive"));
        }
        let ds = Arc::new(FileRefreshableDataSource {
            path: path.into(),
            converter,
            property: Arc::new(DynamicProperty::default()),
            last_modified: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        // the file may be created later, the refreshing task picks it up then
        if let Err(err) = ds.refresh() {
            logging::warn!(
                "[FileRefreshableDataSource] Initial load failed, path: {}, error: {:?}",
                ds.path.display(),
                err
            );
        }
        spawn_refresh_task(&ds, refresh_ms)?;
        Ok(ds)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads the file if it is modified since the last read.
    /// Returns whether the property value changed.
    pub fn refresh(&self) -> Result<bool> {
        if !self.is_modified()? {
            return Ok(false);
        }
        let value = self.load_config()?;
        Ok(self.property.update_value(value))
    }

    fn is_modified(&self) -> Result<bool> {
        let metadata = fs::metadata(&self.path)?;
        let current = Some((metadata.modified()?, metadata.len()));
        let mut last_modified = self.last_modified.lock().unwrap();
        if *last_modified == current {
            return Ok(false);
        }
        *last_modified = current;
        Ok(true)
    }
}

impl<T> ReadableDataSource<T> for FileRefreshableDataSource<T>
where
    T: Clone + PartialEq + Default + Send + Sync + 'static,
{
    fn load_config(&self) -> Result<T> {
        let src = self.read_source()?;
        (self.converter)(&src)
    }

    fn read_source(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    fn property(&self) -> Arc<DynamicProperty<T>> {
        Arc::clone(&self.property)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn spawn_refresh_task<T>(ds: &Arc<FileRefreshableDataSource<T>>, refresh_ms: u64) -> Result<()>
where
    T: Clone + PartialEq + Default + Send + Sync + 'static,
{
    let weak: Weak<FileRefreshableDataSource<T>> = Arc::downgrade(ds);
    std::thread::Builder::new()
        .name("sentinel-datasource-auto-refresh-task".into())
        .spawn(move || loop {
            utils::sleep_for_ms(refresh_ms);
            let ds = match weak.upgrade() {
                Some(ds) => ds,
                None => break,
            };
            if ds.closed.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = ds.refresh() {
                logging::info!(
                    "[FileRefreshableDataSource] Failed to refresh, path: {}, error: {:?}",
                    ds.path.display(),
                    err
                );
            }
        })?;
    Ok(())
}

/// FileWritableDataSource writes the encoded value into a file, replacing its content.
pub struct FileWritableDataSource<T> {
    path: PathBuf,
    encoder: Encoder<T>,
    lock: Mutex<()>,
}

impl<T> FileWritableDataSource<T> {
    pub fn new<P: Into<PathBuf>>(path: P, encoder: Encoder<T>) -> Self {
        FileWritableDataSource {
            path: path.into(),
            encoder,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Send + Sync> WritableDataSource<T> for FileWritableDataSource<T> {
    fn write(&self, value: &T) -> Result<()> {
        let content = (self.encoder)(value)?;
        let _guard = self.lock.lock().unwrap();
        fs::write(&self.path, content)?;
        Ok(())
    }
}
