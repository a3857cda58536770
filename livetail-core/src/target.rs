use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

/// Which log stream of the platform a session attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChannel {
    /// runtime logs of a container inside an environment
    Container {
        project: String,
        environment: String,
        container: String,
    },
    /// build logs of one job of a deployment
    DeploymentJob {
        project: String,
        deployment: String,
        job: String,
    },
}

impl LogChannel {
    fn segments(&self) -> Vec<&str> {
        match self {
            LogChannel::Container {
                project,
                environment,
                container,
            } => vec![
                "projects",
                project,
                "environments",
                environment,
                "containers",
                container,
                "logs",
            ],
            LogChannel::DeploymentJob {
                project,
                deployment,
                job,
            } => vec![
                "projects",
                project,
                "deployments",
                deployment,
                "jobs",
                job,
                "logs",
                "tail",
            ],
        }
    }

    fn validate(&self) -> Result<(), TargetError> {
        let checks: [(&'static str, &str); 3] = match self {
            LogChannel::Container {
                project,
                environment,
                container,
            } => [
                ("project", project),
                ("environment", environment),
                ("container", container),
            ],
            LogChannel::DeploymentJob {
                project,
                deployment,
                job,
            } => [("project", project), ("deployment", deployment), ("job", job)],
        };
        for (name, value) in checks {
            if value.trim().is_empty() {
                return Err(TargetError::EmptySegment(name));
            }
        }
        Ok(())
    }

    /// short label for status displays, e.g. `myapp/web-1`
    pub fn describe(&self) -> String {
        match self {
            LogChannel::Container {
                project, container, ..
            } => format!("{project}/{container}"),
            LogChannel::DeploymentJob { project, job, .. } => format!("{project}/{job}"),
        }
    }
}

/// Server-side filtering applied to the stream.
///
/// `tail_count: None` leaves the tail length to the server (everything it
/// has). `timestamps` asks the server to prefix plain lines with an
/// RFC3339 stamp; the normalizer splits it back off for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamFilters {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub tail_count: Option<u64>,
    pub timestamps: bool,
}

/// Errors for targets that could never produce a working session. These
/// fail fast at construction; nothing retries a broken configuration.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid endpoint URL: {0}")]
    InvalidBase(#[from] url::ParseError),
    #[error("unsupported endpoint scheme `{0}` (expected ws, wss, http or https)")]
    UnsupportedScheme(String),
    #[error("endpoint URL cannot carry path segments")]
    OpaqueBase,
    #[error("{0} identifier must not be empty")]
    EmptySegment(&'static str),
}

/// Immutable description of one log stream: endpoint plus server-side
/// filters.
///
/// Two targets compare equal only when every part matches; any difference
/// is a new target and tears the running session and its buffer down.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTarget {
    base: Url,
    channel: LogChannel,
    filters: StreamFilters,
}

impl ChannelTarget {
    /// validates the endpoint and identifiers up front; `http`/`https`
    /// bases are accepted and mapped to `ws`/`wss`
    pub fn new(
        base: &str,
        channel: LogChannel,
        filters: StreamFilters,
    ) -> Result<Self, TargetError> {
        let mut base = Url::parse(base)?;
        let mapped = match base.scheme() {
            "ws" | "wss" => None,
            "http" => Some("ws"),
            "https" => Some("wss"),
            other => return Err(TargetError::UnsupportedScheme(other.to_string())),
        };
        if let Some(scheme) = mapped
            && base.set_scheme(scheme).is_err()
        {
            return Err(TargetError::UnsupportedScheme(scheme.to_string()));
        }
        if base.cannot_be_a_base() {
            return Err(TargetError::OpaqueBase);
        }
        channel.validate()?;
        Ok(Self {
            base,
            channel,
            filters,
        })
    }

    pub fn channel(&self) -> &LogChannel {
        &self.channel
    }

    pub fn filters(&self) -> &StreamFilters {
        &self.filters
    }

    /// same channel with different filters; still a brand-new target
    pub fn with_filters(&self, filters: StreamFilters) -> Self {
        Self {
            base: self.base.clone(),
            channel: self.channel.clone(),
            filters,
        }
    }

    pub fn describe(&self) -> String {
        self.channel.describe()
    }

    /// the final `ws(s)://` URL with path segments and query encoded
    pub fn url(&self) -> Url {
        let mut url = self.base.clone();
        {
            // ruled out in new(): the base is never opaque
            let Ok(mut segments) = url.path_segments_mut() else {
                return url;
            };
            segments.pop_if_empty();
            for segment in self.channel.segments() {
                segments.push(segment);
            }
        }
        {
            let mut query = url.query_pairs_mut();
            if let Some(start) = self.filters.start_time {
                query.append_pair("start_date", &start.timestamp().to_string());
            }
            if let Some(end) = self.filters.end_time {
                query.append_pair("end_date", &end.timestamp().to_string());
            }
            if let Some(tail) = self.filters.tail_count {
                query.append_pair("tail", &tail.to_string());
            }
            if self.filters.timestamps {
                query.append_pair("timestamps", "true");
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        url
    }
}
