/// Errors that can occur while serving a demo request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The callback request carried no `code` parameter
    #[error("Ongeldige aanroep.")]
    MissingAuthorizationCode,
    /// The token endpoint did not hand out an access token; carries the raw response
    #[error("Er is een fout opgetreden. (Response: {0})")]
    TokenExchangeFailed(String),
    /// The CRM proxy answered with a non-200 code or flagged an error
    #[error("API-error: HTTP {code} - Civi msg: {message}")]
    UpstreamApi {
        /// HTTP status code of the CRM call
        code: u16,
        /// Error message supplied by the CRM, empty when absent
        message: String,
    },
    /// A network error occurred during communication with the provider
    #[error("Network error")]
    Network,
    /// The provider behaved in a way the client cannot handle
    #[error("Provider error: {0}")]
    Provider(String),
    /// Required configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),
}

