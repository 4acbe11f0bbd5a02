use crate::application::logger::RequestLogger;

/// Shared state of the demo service.
#[derive(Clone)]
pub struct AppState {
    pub logger: RequestLogger,
}

impl AppState {
    pub fn new(logger: RequestLogger) -> Self {
        Self { logger }
    }
}
