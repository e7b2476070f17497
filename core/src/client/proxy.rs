use reqwest::{ClientBuilder, Proxy, Url};

const PROXY_ENV_KEYS: &[&str] = &["http_proxy", "HTTP_PROXY"];

/// Outbound route for every worker, resolved once before workers start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    #[default]
    Direct,
    Http(Url),
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Resolves the proxy from `http_proxy`/`HTTP_PROXY`. A malformed value is
    /// logged and treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some((key, raw)) = PROXY_ENV_KEYS
            .iter()
            .find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()).map(|v| (*k, v)))
        else {
            return Self::Direct;
        };

        match Self::parse(&raw) {
            Ok(cfg) => {
                tracing::info!(env = key, proxy = %raw.trim(), "using http proxy");
                cfg
            }
            Err(reason) => {
                tracing::error!(
                    env = key,
                    proxy = %raw,
                    error = %reason,
                    "invalid proxy url, dialing directly"
                );
                Self::Direct
            }
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        let url = Url::parse(&with_scheme).map_err(|e| e.to_string())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported proxy scheme {:?}", url.scheme()));
        }
        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err("proxy url has no host".to_string());
        }
        Ok(Self::Http(url))
    }

    /// Installs this route on a client builder. reqwest's own environment
    /// lookup is always disabled so only the resolved value applies.
    pub(crate) fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
        let builder = builder.no_proxy();
        match self {
            Self::Direct => builder,
            Self::Http(url) => match Proxy::all(url.clone()) {
                Ok(proxy) => builder.proxy(proxy),
                Err(e) => {
                    tracing::error!(proxy = %url, error = %e, "proxy rejected, dialing directly");
                    builder
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |k| map.get(k).map(|v| v.to_string())
    }

    #[test]
    fn unset_means_direct() {
        assert_eq!(ProxyConfig::from_lookup(lookup(&[])), ProxyConfig::Direct);
        assert_eq!(
            ProxyConfig::from_lookup(lookup(&[("http_proxy", "   ")])),
            ProxyConfig::Direct
        );
    }

    #[test]
    fn lowercase_variable_wins() {
        let cfg = ProxyConfig::from_lookup(lookup(&[
            ("http_proxy", "http://lower:3128"),
            ("HTTP_PROXY", "http://upper:3128"),
        ]));
        assert_eq!(
            cfg,
            ProxyConfig::Http(Url::parse("http://lower:3128").unwrap())
        );
    }

    #[test]
    fn bare_host_port_gets_http_scheme() {
        let cfg = ProxyConfig::parse("proxy.local:8080").unwrap();
        assert_eq!(
            cfg,
            ProxyConfig::Http(Url::parse("http://proxy.local:8080").unwrap())
        );
    }

    #[test]
    fn malformed_proxy_falls_back_to_direct() {
        assert_eq!(
            ProxyConfig::from_lookup(lookup(&[("http_proxy", "http://[::1")])),
            ProxyConfig::Direct
        );
        assert_eq!(
            ProxyConfig::from_lookup(lookup(&[("HTTP_PROXY", "ftp://proxy:21")])),
            ProxyConfig::Direct
        );
    }
}
