//! Connection extensions
//!
//! A [`Modifier`] is an extension object handed to the builder at
//! construction. Each one gets a single `attach` call against the freshly
//! opened connection, in registration order; a failed attach aborts the
//! open. There is no discovery mechanism: the list is explicit.

use crate::connection::Connection;
use docket_core::Result;

/// Extension hook attached to a connection at open
pub trait Modifier {
    /// Name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Called once when the owning connection opens
    fn attach(&self, conn: &Connection) -> Result<()>;
}
