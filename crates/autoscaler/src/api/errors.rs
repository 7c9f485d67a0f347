use core::error::Error;

/// API errors
#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    #[display("Server error: {message}")]
    ServerError { message: String },
}

impl Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let error = ApiError::ServerError {
            message: "address in use".to_string(),
        };
        assert_eq!(error.to_string(), "Server error: address in use");
    }
}
