pub mod chain;
pub mod classifier;
pub mod descriptor;
pub mod probe;
pub mod reconciler;
pub mod store;

pub use chain::{amounts_close, SourceChainConfig, VerificationSourceChain};
pub use classifier::{Classifier, IndicatorClassifier};
pub use descriptor::DomainConfigLoader;
pub use probe::{CurlProbe, FallbackProbe, FetchProbe, HttpProbe, ProbeResponse};
pub use reconciler::PaymentReconciler;
pub use store::{MemoryPaymentStore, PaymentStore, RestPaymentStore};
