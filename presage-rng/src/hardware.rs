//! Psyleron REG hardware generator.
//!
//! Every draw enumerates the attached devices, opens the first one, reads
//! bit by bit and tears everything down again. Teardown lives in a guard so it
//! runs on every exit path, in the order the vendor API requires: close the
//! source, release it, then clear the enumerated list.

use std::ffi::{CStr, c_char, c_int, c_uchar, c_uint, c_ulong};
use std::path::{Path, PathBuf};

use libloading::Library;
use log::{debug, warn};

use crate::bits::BitString;
use crate::error::RngError;
use crate::source::RandomSource;

pub type DataSource = c_int;

pub const INVALID_DATASOURCE: DataSource = -1;
pub const API_VERSION: c_int = 1;

pub const BSS_BUSY: u32 = 0x0004;
pub const BSS_NODEVICE: u32 = 0x0008;
pub const BSS_READERROR: u32 = 0x0010;
pub const BSS_INVALID: u32 = 0x0200;
pub const BSS_GENERALERROR: u32 = 0x8000;

/// Calls exposed by the vendor REG library.
pub trait RegDriver {
    /// Builds the internal source list. Must precede `source_count`/`get_source`.
    fn enumerate(&mut self) -> i32;
    fn source_count(&mut self) -> u32;
    fn get_source(&mut self, index: u32) -> DataSource;
    fn open(&mut self, source: DataSource) -> bool;
    fn status(&mut self, source: DataSource) -> u32;
    fn device_type(&mut self, source: DataSource) -> String;
    fn device_id(&mut self, source: DataSource) -> String;
    fn get_bit(&mut self, source: DataSource) -> Option<bool>;
    fn close(&mut self, source: DataSource);
    fn release(&mut self, source: DataSource);
    /// Never call while a source is still held.
    fn clear(&mut self);
}

/// First enumerated source, released on drop.
struct Acquired<'a, D: RegDriver> {
    driver: &'a mut D,
    source: DataSource,
    opened: bool,
}

impl<'a, D: RegDriver> Acquired<'a, D> {
    fn acquire(driver: &'a mut D) -> Result<Self, RngError> {
        driver.enumerate();
        if driver.source_count() == 0 {
            driver.clear();
            return Err(RngError::DeviceUnavailable("no REG device attached".into()));
        }
        let source = driver.get_source(0);
        if source == INVALID_DATASOURCE {
            driver.clear();
            return Err(RngError::DeviceUnavailable("REG source is invalid".into()));
        }
        Ok(Self {
            driver,
            source,
            opened: false,
        })
    }

    fn open(&mut self) -> Result<(), RngError> {
        if !self.driver.open(self.source) {
            return Err(self.status_error("open failed"));
        }
        self.opened = true;
        Ok(())
    }

    fn status_error(&mut self, what: &str) -> RngError {
        let status = self.driver.status(self.source);
        let reason = if status & BSS_BUSY != 0 {
            "device in use by another application"
        } else if status & (BSS_NODEVICE | BSS_INVALID) != 0 {
            "device disconnected"
        } else if status & (BSS_READERROR | BSS_GENERALERROR) != 0 {
            "device error"
        } else {
            "no data"
        };
        RngError::DeviceUnavailable(format!("{what}: {reason} (status {status:#06x})"))
    }
}

impl<D: RegDriver> Drop for Acquired<'_, D> {
    fn drop(&mut self) {
        if self.opened {
            self.driver.close(self.source);
        }
        self.driver.release(self.source);
        self.driver.clear();
    }
}

/// Hardware generator over any [`RegDriver`].
pub struct HardwareRng<D: RegDriver> {
    driver: D,
    name: String,
}

impl<D: RegDriver> HardwareRng<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            name: "Psyleron".to_string(),
        }
    }

    /// Confirms a device is attached and returns its display name.
    pub fn probe(&mut self) -> Result<String, RngError> {
        let mut guard = Acquired::acquire(&mut self.driver)?;
        let kind = guard.driver.device_type(guard.source);
        let id = guard.driver.device_id(guard.source);
        drop(guard);
        if kind.is_empty() {
            return Err(RngError::DeviceUnavailable("REG source is invalid".into()));
        }
        self.name = format!("Psyleron {kind}: {id}");
        Ok(self.name.clone())
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: RegDriver> RandomSource for HardwareRng<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_bits(&mut self, count: usize) -> Result<BitString, RngError> {
        let mut guard = Acquired::acquire(&mut self.driver)?;
        guard.open()?;
        let mut bits = BitString::with_capacity(count);
        for _ in 0..count {
            match guard.driver.get_bit(guard.source) {
                Some(bit) => bits.push(bit),
                None => return Err(guard.status_error("read failed")),
            }
        }
        debug!("{} hardware bits: {bits}", bits.len());
        Ok(bits)
    }
}

type FnApiVersion = unsafe extern "C" fn() -> c_int;
type FnEnumerate = unsafe extern "C" fn() -> c_int;
type FnSourceCount = unsafe extern "C" fn() -> c_uint;
type FnClear = unsafe extern "C" fn();
type FnGetSource = unsafe extern "C" fn(c_uint) -> DataSource;
type FnSourceOp = unsafe extern "C" fn(DataSource);
type FnOpen = unsafe extern "C" fn(DataSource) -> c_int;
type FnStatus = unsafe extern "C" fn(DataSource) -> c_ulong;
type FnDescribe = unsafe extern "C" fn(DataSource, *mut c_char) -> *const c_char;
type FnGetBit = unsafe extern "C" fn(DataSource, *mut c_uchar) -> c_int;

/// The vendor PsyREG library, loaded at runtime.
pub struct RegLibrary {
    enumerate: FnEnumerate,
    source_count: FnSourceCount,
    clear: FnClear,
    get_source: FnGetSource,
    release: FnSourceOp,
    open: FnOpen,
    close: FnSourceOp,
    status: FnStatus,
    device_type: FnDescribe,
    device_id: FnDescribe,
    get_bit: FnGetBit,
    // keeps the function pointers above valid
    _lib: Library,
}

impl RegLibrary {
    pub fn load(path: &Path) -> Result<Self, RngError> {
        let err = |source: libloading::Error| RngError::Library {
            path: PathBuf::from(path),
            source,
        };
        // SAFETY: the signatures below follow psyreg.h. The pointers are
        // copied out of their symbols and stay valid while `_lib` is alive.
        unsafe {
            let lib = Library::new(path).map_err(err)?;
            let version = *lib.get::<FnApiVersion>(b"PsyREGAPIVersion").map_err(err)?;
            let found = version();
            if found != API_VERSION {
                warn!("PsyREG API version {found}, expected {API_VERSION}");
            }
            let enumerate = *lib.get::<FnEnumerate>(b"PsyREGEnumerateSources").map_err(err)?;
            let source_count = *lib.get::<FnSourceCount>(b"PsyREGGetSourceCount").map_err(err)?;
            let clear = *lib.get::<FnClear>(b"PsyREGClearSources").map_err(err)?;
            let get_source = *lib.get::<FnGetSource>(b"PsyREGGetSource").map_err(err)?;
            let release = *lib.get::<FnSourceOp>(b"PsyREGReleaseSource").map_err(err)?;
            let open = *lib.get::<FnOpen>(b"PsyREGOpen").map_err(err)?;
            let close = *lib.get::<FnSourceOp>(b"PsyREGClose").map_err(err)?;
            let status = *lib.get::<FnStatus>(b"PsyREGGetStatus").map_err(err)?;
            let device_type = *lib.get::<FnDescribe>(b"PsyREGGetDeviceType").map_err(err)?;
            let device_id = *lib.get::<FnDescribe>(b"PsyREGGetDeviceId").map_err(err)?;
            let get_bit = *lib.get::<FnGetBit>(b"PsyREGGetBit").map_err(err)?;
            Ok(Self {
                enumerate,
                source_count,
                clear,
                get_source,
                release,
                open,
                close,
                status,
                device_type,
                device_id,
                get_bit,
                _lib: lib,
            })
        }
    }

    fn describe(f: FnDescribe, source: DataSource) -> String {
        // the API asks for at least 64 bytes
        let mut buf = [0u8; 256];
        // SAFETY: `buf` outlives the call and is larger than the API minimum.
        unsafe {
            f(source, buf.as_mut_ptr().cast());
        }
        CStr::from_bytes_until_nul(&buf)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// SAFETY (all calls below): plain C calls into the loaded library with
// arguments matching psyreg.h.
impl RegDriver for RegLibrary {
    fn enumerate(&mut self) -> i32 {
        unsafe { (self.enumerate)() }
    }

    fn source_count(&mut self) -> u32 {
        unsafe { (self.source_count)() }
    }

    fn get_source(&mut self, index: u32) -> DataSource {
        unsafe { (self.get_source)(index) }
    }

    fn open(&mut self, source: DataSource) -> bool {
        unsafe { (self.open)(source) != 0 }
    }

    fn status(&mut self, source: DataSource) -> u32 {
        unsafe { (self.status)(source) as u32 }
    }

    fn device_type(&mut self, source: DataSource) -> String {
        Self::describe(self.device_type, source)
    }

    fn device_id(&mut self, source: DataSource) -> String {
        Self::describe(self.device_id, source)
    }

    fn get_bit(&mut self, source: DataSource) -> Option<bool> {
        let mut byte: c_uchar = 0;
        let ok = unsafe { (self.get_bit)(source, &mut byte) };
        (ok != 0).then_some(byte & 1 == 1)
    }

    fn close(&mut self, source: DataSource) {
        unsafe { (self.close)(source) }
    }

    fn release(&mut self, source: DataSource) {
        unsafe { (self.release)(source) }
    }

    fn clear(&mut self) {
        unsafe { (self.clear)() }
    }
}
