//! Transport adapters for the logicbox engine
//!
//! Every adapter decodes a request, hands it to the shared
//! [`SandboxService`](logicbox_sandbox::SandboxService) and maps the response
//! onto its own framing. Status mapping is shared so all adapters agree.

pub mod function_handler;
pub mod http_server;
mod logging;
pub mod stdio_handler;

pub use function_handler::{handle_event, FunctionResponse};
pub use http_server::{create_router, start_server, HttpServerState};
pub use logging::{init_tracing, LogOptions};
pub use stdio_handler::{StdioHandler, StdioStats, DEFAULT_MAX_LINE_BYTES};

use logicbox_common::{DiagnosticKind, ScriptResponse};

/// HTTP-style status code for a response.
///
/// Succeeded is 200, MalformedInput 400, SyntaxFault and UnresolvedSymbol 422,
/// RuntimeFault 500.
pub fn status_code(response: &ScriptResponse) -> u16 {
    match response.error_kind() {
        None => 200,
        Some(DiagnosticKind::MalformedInput) => 400,
        Some(DiagnosticKind::SyntaxFault) | Some(DiagnosticKind::UnresolvedSymbol) => 422,
        Some(DiagnosticKind::RuntimeFault) => 500,
    }
}
