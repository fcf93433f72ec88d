mod codec;
mod encoded;
mod router;
mod traits;

pub use codec::{PlainCodec, XorCodec};
pub use encoded::{forward_request, DirectClient, EncodedPathEngine};
pub use router::EngineRouter;
pub use traits::{PassthroughClient, ProxyEngine, UrlCodec};
