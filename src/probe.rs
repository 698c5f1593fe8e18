//! Bounded fan-out of checks over a list of targets.
//!
//! [`probe_pipeline`] is a two-step [`Pipeline`]: the first step fans the targets out
//! through [`map_async`] with the configured concurrency, the second summarises the
//! ordered outcomes into a [`ProbeReport`]. A transport failure on any target fails the
//! run with that error; targets still in flight finish in the background.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::contract::{ProbeError, ProbeOutcome, Prober, Target};
use crate::map::{map_async, MapOptions, Mapper};
use crate::pipe::Pipeline;
use crate::pipe_async;
use crate::value::Value;

/// Aggregated outcomes, in target order.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub outcomes: Vec<ProbeOutcome>,
    pub healthy: usize,
    pub unhealthy: usize,
}

impl ProbeReport {
    pub fn new(outcomes: Vec<ProbeOutcome>) -> Self {
        let healthy = outcomes.iter().filter(|o| o.healthy).count();
        let unhealthy = outcomes.len() - healthy;
        ProbeReport {
            outcomes,
            healthy,
            unhealthy,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.unhealthy == 0
    }
}

/// HTTP prober backed by `reqwest`. Any 2xx or 3xx status counts as healthy.
///
/// Redirects are not followed, so a 3xx answer is reported as the target's own status.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(HttpProber { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        HttpProber { client }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &Target) -> Result<ProbeOutcome, ProbeError> {
        let url = reqwest::Url::parse(&target.url).map_err(|e| {
            error!(target = %target.name, url = %target.url, error = ?e, "[PROBE] Invalid target url");
            ProbeError::InvalidUrl(target.url.clone())
        })?;

        let started = Instant::now();
        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!(target = %target.name, url = %target.url, error = ?e, "[PROBE] Request failed");
                return Err(ProbeError::from(e));
            }
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status();
        let healthy = status.is_success() || status.is_redirection();

        debug!(
            target = %target.name,
            status = status.as_u16(),
            elapsed_ms,
            healthy,
            "[PROBE] Target answered"
        );

        Ok(ProbeOutcome {
            name: target.name.clone(),
            url: target.url.clone(),
            status: status.as_u16(),
            healthy,
            elapsed_ms,
        })
    }
}

/// Builds the probe-then-summarise pipeline for `prober`, capped by `options`.
pub fn probe_pipeline<P>(
    prober: Arc<P>,
    options: MapOptions,
) -> Pipeline<Vec<Target>, ProbeReport, ProbeError>
where
    P: Prober + ?Sized + 'static,
{
    pipe_async![
        move |targets: Vec<Target>| {
            info!(
                targets = targets.len(),
                concurrency = ?options.concurrency,
                "[PROBE] Fanning out"
            );
            let prober = Arc::clone(&prober);
            let mapper: Mapper<Target, ProbeError> = map_async(targets);
            Value::pending(mapper.run_with(
                move |target: Target| {
                    let prober = Arc::clone(&prober);
                    Value::pending(async move { prober.probe(&target).await })
                },
                options,
            ))
        },
        |outcomes: Vec<ProbeOutcome>| {
            let report = ProbeReport::new(outcomes);
            info!(
                healthy = report.healthy,
                unhealthy = report.unhealthy,
                "[PROBE] Summarised"
            );
            Ok::<_, ProbeError>(report)
        },
    ]
}

/// Checks every target with at most `options.concurrency` checks in flight.
pub async fn probe_all<P>(
    prober: Arc<P>,
    targets: Vec<Target>,
    options: MapOptions,
) -> Result<ProbeReport, ProbeError>
where
    P: Prober + ?Sized + 'static,
{
    probe_pipeline(prober, options).call(targets).await
}
