//! View-state primitives a client screen drives: list filtering, the create/edit modal,
//! form sessions and toasts. Nothing here touches the network.

pub mod form;
pub mod list;
pub mod modal;
pub mod toast;

pub use form::{FormSession, SubmitError};
pub use list::{FetchState, ListView, Listable, Visible};
pub use modal::{IllegalTransition, ModalController, ModalState};
pub use toast::{Toast, ToastLevel};
