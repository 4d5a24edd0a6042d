use std::ops::{Deref, DerefMut};

use log::warn;

use crate::error::OperatorError;
use crate::host::{Host, Mode};

/// Keeps the host in edit mode while alive and switches back to object mode
/// on drop, on every exit path.
pub struct EditModeGuard<'a, H: Host + ?Sized> {
    host: &'a mut H,
}

impl<'a, H: Host + ?Sized> EditModeGuard<'a, H> {
    pub fn enter(host: &'a mut H) -> Result<Self, OperatorError> {
        if let Err(err) = host.set_mode(Mode::Edit) {
            restore_object_mode(host);
            return Err(err);
        }
        Ok(Self { host })
    }
}

impl<H: Host + ?Sized> Deref for EditModeGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &*self.host
    }
}

impl<H: Host + ?Sized> DerefMut for EditModeGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut *self.host
    }
}

impl<H: Host + ?Sized> Drop for EditModeGuard<'_, H> {
    fn drop(&mut self) {
        restore_object_mode(&mut *self.host);
    }
}

fn restore_object_mode<H: Host + ?Sized>(host: &mut H) {
    if host.mode() == Mode::Object {
        return;
    }
    if let Err(err) = host.set_mode(Mode::Object) {
        warn!("Could not return to object mode: {}", err);
    }
}
