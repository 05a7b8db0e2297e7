//! Windows Installer session backed by an `MSIHANDLE`.

use windows::Win32::Foundation::{ERROR_MORE_DATA, ERROR_SUCCESS};
use windows::Win32::System::ApplicationInstallationAndServicing::{
    INSTALLMESSAGE_INFO, MSIHANDLE, MsiCloseHandle, MsiCreateRecord, MsiGetPropertyW,
    MsiProcessMessage, MsiRecordSetStringW, MsiSetPropertyW,
};
use windows::core::{HSTRING, PWSTR};

use crate::context::{InstallerSession, SessionError};

/// Session of the installation that invoked the custom action.
pub struct MsiSession {
    handle: MSIHANDLE,
}

impl MsiSession {
    pub fn new(handle: MSIHANDLE) -> Self {
        Self { handle }
    }
}

impl InstallerSession for MsiSession {
    fn get_property(&self, name: &str) -> Result<Option<String>, SessionError> {
        let name = HSTRING::from(name);

        // First call sizes the value (excluding the terminator).
        let mut empty = [0u16; 1];
        let mut count = 0u32;
        let er = unsafe {
            MsiGetPropertyW(
                self.handle,
                &name,
                Some(PWSTR(empty.as_mut_ptr())),
                Some(&mut count),
            )
        };
        if er != ERROR_MORE_DATA.0 && er != ERROR_SUCCESS.0 {
            return Err(SessionError::from_win32(er));
        }

        count += 1;
        let mut value = vec![0u16; count as usize];
        let er = unsafe {
            MsiGetPropertyW(
                self.handle,
                &name,
                Some(PWSTR(value.as_mut_ptr())),
                Some(&mut count),
            )
        };
        if er != ERROR_SUCCESS.0 {
            return Err(SessionError::from_win32(er));
        }

        let value = String::from_utf16_lossy(&value[..count as usize]);
        Ok((!value.is_empty()).then_some(value))
    }

    fn set_property(&self, name: &str, value: &str) -> Result<(), SessionError> {
        let er =
            unsafe { MsiSetPropertyW(self.handle, &HSTRING::from(name), &HSTRING::from(value)) };
        if er == ERROR_SUCCESS.0 {
            Ok(())
        } else {
            Err(SessionError::from_win32(er))
        }
    }

    fn log(&self, message: &str) {
        unsafe {
            let record = MsiCreateRecord(1);
            if record.0 == 0 {
                return;
            }
            let _ = MsiRecordSetStringW(record, 0, &HSTRING::from(message));
            let _ = MsiProcessMessage(self.handle, INSTALLMESSAGE_INFO, record);
            let _ = MsiCloseHandle(record);
        }
    }
}
