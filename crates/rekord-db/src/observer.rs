//! Field change notifications.

use rekord_core::Record;

/// Notified around every field assignment the façade makes
///
/// Each assigned field gets exactly one `will_change` before and one
/// `did_change` after the write, in property-bag order.
pub trait FieldObserver: Send + Sync {
    /// The field is about to change; `record` still holds the old value.
    fn will_change(&self, record: &Record, field: &str);

    /// The field has changed; `record` holds the new value.
    fn did_change(&self, record: &Record, field: &str);
}
