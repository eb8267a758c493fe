//! The put/get admission scaffold shared by all resources.

use std::ops::Deref;

use crate::core::{Event, SimResult};

/// Base contract of a put/get resource.
///
/// A resource keeps a queue of pending put events and a queue of pending get
/// events. Whenever capacity-relevant state changes it calls
/// [`Admission::trigger_put`] or [`Admission::trigger_get`], which offer the
/// queue heads to [`Admission::do_put`] / [`Admission::do_get`] until one of
/// them stays pending or the hook asks to stop.
pub trait Admission {
    /// Pending put event type.
    type Put: Clone + Deref<Target = Event>;
    /// Pending get event type.
    type Get: Clone + Deref<Target = Event>;

    /// Head of the put-queue.
    fn next_put(&self) -> Option<Self::Put>;
    /// Drop a put event from the put-queue.
    fn remove_put(&self, put: &Self::Put) -> SimResult<()>;
    /// Head of the get-queue.
    fn next_get(&self) -> Option<Self::Get>;
    /// Drop a get event from the get-queue.
    fn remove_get(&self, get: &Self::Get) -> SimResult<()>;

    /// Try to satisfy `put`, triggering it on success. Returns whether the
    /// next put should be tried as well.
    fn do_put(&self, put: &Self::Put) -> SimResult<bool>;
    /// Try to satisfy `get`, triggering it on success. Returns whether the
    /// next get should be tried as well.
    fn do_get(&self, get: &Self::Get) -> SimResult<bool>;

    /// Offer pending puts to [`Admission::do_put`], head first.
    fn trigger_put(&self) -> SimResult<()> {
        while let Some(put) = self.next_put() {
            let proceed = self.do_put(&put)?;
            if !put.is_triggered() {
                break;
            }
            self.remove_put(&put)?;
            if !proceed {
                break;
            }
        }
        Ok(())
    }

    /// Offer pending gets to [`Admission::do_get`], head first.
    fn trigger_get(&self) -> SimResult<()> {
        while let Some(get) = self.next_get() {
            let proceed = self.do_get(&get)?;
            if !get.is_triggered() {
                break;
            }
            self.remove_get(&get)?;
            if !proceed {
                break;
            }
        }
        Ok(())
    }
}
