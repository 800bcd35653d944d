//! Flash-backed [`StoragePort`] for the rolling-code slots.
//!
//! On the device every call opens its namespace, does one operation and
//! commits before the handle is closed.  A slot therefore holds either the
//! previous blob or the new one after a power cut, never a mix.
//!
//! The host backend is an ordered in-memory map.  It lives as long as the
//! adapter, so tests model a reboot by keeping the adapter and rebuilding
//! everything around it.

use crate::app::ports::{StorageError, StoragePort};
use log::info;

#[cfg(not(target_os = "espidf"))]
use std::{cell::RefCell, collections::BTreeMap};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_ERR_NVS_INVALID_LENGTH, ESP_ERR_NVS_NEW_VERSION_FOUND, ESP_ERR_NVS_NO_FREE_PAGES,
    ESP_ERR_NVS_NOT_ENOUGH_SPACE, ESP_ERR_NVS_NOT_FOUND, ESP_OK, esp_err_t, nvs_close,
    nvs_commit, nvs_find_key, nvs_flash_erase, nvs_flash_init, nvs_get_blob, nvs_handle_t, nvs_open,
    nvs_open_mode_t_NVS_READONLY, nvs_open_mode_t_NVS_READWRITE, nvs_set_blob,
};
#[cfg(target_os = "espidf")]
use log::warn;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    blobs: RefCell<BTreeMap<(String, String), Vec<u8>>>,
}

impl NvsAdapter {
    /// Bring up the NVS partition.
    ///
    /// A partition that is full or was written by a newer layout is erased
    /// first.  That drops every stored code, and the motors must be paired
    /// again.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: runs once on the main task before any handle is opened.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: partition unusable ({}), erasing", ret);
                check(unsafe { nvs_flash_erase() }).map_err(|_| StorageError::IoError)?;
                check(unsafe { nvs_flash_init() }).map_err(|_| StorageError::IoError)?;
            } else {
                check(ret).map_err(|_| StorageError::IoError)?;
            }
            info!("NVS: ready");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NVS: in-memory store");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            blobs: RefCell::new(BTreeMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn slot(namespace: &str, key: &str) -> (String, String) {
        (namespace.to_owned(), key.to_owned())
    }
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t) -> Result<(), esp_err_t> {
    if ret == ESP_OK { Ok(()) } else { Err(ret) }
}

/// NVS names are at most 15 bytes plus the terminator.
#[cfg(target_os = "espidf")]
struct CName([u8; 16]);

#[cfg(target_os = "espidf")]
impl CName {
    fn new(name: &str) -> Self {
        let mut buf = [0u8; 16];
        let n = name.len().min(15);
        buf[..n].copy_from_slice(&name.as_bytes()[..n]);
        Self(buf)
    }

    fn ptr(&self) -> *const core::ffi::c_char {
        self.0.as_ptr().cast()
    }
}

/// An open namespace; closed on drop.
#[cfg(target_os = "espidf")]
struct NvsHandle(nvs_handle_t);

#[cfg(target_os = "espidf")]
impl NvsHandle {
    fn open(namespace: &str, writable: bool) -> Result<Self, esp_err_t> {
        let mode = if writable {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut raw: nvs_handle_t = 0;
        check(unsafe { nvs_open(CName::new(namespace).ptr(), mode, &mut raw) })?;
        Ok(Self(raw))
    }

    fn get_blob(&self, key: &str, buf: &mut [u8]) -> Result<usize, esp_err_t> {
        let mut len = buf.len();
        check(unsafe {
            nvs_get_blob(self.0, CName::new(key).ptr(), buf.as_mut_ptr().cast(), &mut len)
        })?;
        Ok(len)
    }

    fn set_blob(&self, key: &str, data: &[u8]) -> Result<(), esp_err_t> {
        check(unsafe {
            nvs_set_blob(self.0, CName::new(key).ptr(), data.as_ptr().cast(), data.len())
        })?;
        check(unsafe { nvs_commit(self.0) })
    }

    fn has(&self, key: &str) -> bool {
        unsafe { nvs_find_key(self.0, CName::new(key).ptr(), core::ptr::null_mut()) == ESP_OK }
    }
}

#[cfg(target_os = "espidf")]
impl Drop for NvsHandle {
    fn drop(&mut self) {
        unsafe { nvs_close(self.0) }
    }
}

#[cfg(target_os = "espidf")]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        // A namespace never written to cannot be opened read-only either.
        match NvsHandle::open(namespace, false).and_then(|h| h.get_blob(key, buf)) {
            Ok(len) => Ok(len),
            Err(ESP_ERR_NVS_NOT_FOUND) => Err(StorageError::NotFound),
            // The stored blob is larger than `buf`.
            Err(ESP_ERR_NVS_INVALID_LENGTH) => Err(StorageError::Oversized),
            Err(e) => {
                warn!("NVS: read {}/{} failed ({})", namespace, key, e);
                Err(StorageError::IoError)
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        NvsHandle::open(namespace, true)
            .and_then(|h| h.set_blob(key, data))
            .map_err(|e| {
                warn!("NVS: write {}/{} failed ({})", namespace, key, e);
                match e {
                    ESP_ERR_NVS_NOT_ENOUGH_SPACE => StorageError::Full,
                    _ => StorageError::IoError,
                }
            })
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        NvsHandle::open(namespace, false)
            .map(|h| h.has(key))
            .unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let blobs = self.blobs.borrow();
        let blob = blobs
            .get(&Self::slot(namespace, key))
            .ok_or(StorageError::NotFound)?;
        buf.get_mut(..blob.len())
            .ok_or(StorageError::Oversized)?
            .copy_from_slice(blob);
        Ok(blob.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.blobs
            .borrow_mut()
            .insert(Self::slot(namespace, key), data.to_vec());
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.blobs.borrow().contains_key(&Self::slot(namespace, key))
    }
}
