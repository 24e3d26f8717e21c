//! Trust boundary for attacker-controlled HTML.
//!
//! Every HTML string that did not originate in the editor goes through the
//! editor's [`TrustedHtmlHandler`] before any parser sees it.

/// Turns untrusted HTML into HTML the host is willing to parse.
pub trait TrustedHtmlHandler {
    fn trust(&self, html: &str) -> String;
}

impl<F> TrustedHtmlHandler for F
where
    F: Fn(&str) -> String,
{
    fn trust(&self, html: &str) -> String {
        self(html)
    }
}

/// Handler that returns the input unchanged. Hosts with a real policy
/// should supply their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughHtml;

impl TrustedHtmlHandler for PassThroughHtml {
    fn trust(&self, html: &str) -> String {
        html.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_handlers() {
        let strip = |html: &str| html.replace("<script>", "");
        assert_eq!(strip.trust("a<script>b"), "ab");
        assert_eq!(PassThroughHtml.trust("<b>x</b>"), "<b>x</b>");
    }
}
