// Main uploader module - orchestrates all upload functionality
//
// Queue store, worker, retry and status projection for picked media

pub mod intake;
pub mod reachability;
pub mod retry;
pub mod session;
pub mod status_presenter;
pub mod transfer;
pub mod upload_queue;
pub mod worker;

pub use intake::{AssetSource, IntakeReport};
pub use reachability::{HttpReachabilityProbe, ReachabilityProbe, StaticReachability};
pub use retry::retry_failed_upload;
pub use session::UploadSession;
pub use status_presenter::{StatusPresenter, StatusView};
pub use transfer::{HttpTransferChannel, TransferChannel};
pub use upload_queue::{QueueSnapshot, UploadQueue};
pub use worker::UploadWorker;
