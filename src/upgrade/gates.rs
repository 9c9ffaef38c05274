//! The three health probes against the database's HTTP control plane.
//!
//! Probe results distinguish "not ready yet, retry" (`GateCheck { ok: false }`)
//! from hard configuration errors (`Err`). Transport failures and non-2xx
//! answers are retryable; only an unresolvable node URL is hard.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct GateCheck {
    pub ok: bool,
    pub info: String,
}

impl GateCheck {
    fn pass(info: impl Into<String>) -> Self {
        Self {
            ok: true,
            info: info.into(),
        }
    }

    fn blocked(info: impl Into<String>) -> Self {
        Self {
            ok: false,
            info: info.into(),
        }
    }
}

pub struct HealthCheckContext {
    http: reqwest::Client,
    base_url: String,
    url_by_tag: HashMap<String, String>,
}

impl HealthCheckContext {
    pub fn new(http: Option<reqwest::Client>, cluster: &RavenDBCluster) -> Self {
        let leader = cluster.leader_url().trim_end_matches('/').to_string();

        let url_by_tag = cluster
            .spec
            .nodes
            .iter()
            .map(|n| (n.tag.to_uppercase(), n.public_server_url.clone()))
            .collect();

        let http = http.unwrap_or_else(|| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("default http client")
        });

        Self {
            http,
            base_url: leader,
            url_by_tag,
        }
    }

    fn url_for_tag(&self, tag: &str) -> &str {
        self.url_by_tag
            .get(&tag.to_uppercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    fn cluster_url(&self) -> Result<&str> {
        if self.base_url.is_empty() {
            return Err(Error::ConfigError("leader URL is empty".to_string()));
        }
        Ok(&self.base_url)
    }

    async fn http_get(&self, url: &str) -> Result<(u16, String), reqwest::Error> {
        let response = self.http.get(url).send().await?;
        let code = response.status().as_u16();
        let body = response.text().await?;
        Ok((code, body))
    }

    /// `GET {node}/setup/alive`; any 2xx passes.
    pub async fn node_alive(&self, tag: &str) -> Result<GateCheck> {
        let node_url = self.url_for_tag(tag).trim().to_string();
        if node_url.is_empty() {
            return Err(Error::ConfigError(format!("no URL for tag {tag:?}")));
        }

        let endpoint = join(&node_url, "/setup/alive");
        match self.http_get(&endpoint).await {
            Err(e) => Ok(GateCheck::blocked(e.to_string())),
            Ok((code, _)) if (200..300).contains(&(code as i32)) => {
                Ok(GateCheck::pass(format!("status:{code}")))
            }
            Ok((code, body)) => Ok(GateCheck::blocked(format!(
                "HTTP {code} ({})",
                truncate(&body, 200)
            ))),
        }
    }

    /// `GET {leader}/admin/debug/node/ping`; every peer must report empty
    /// SetupAlive and TcpInfo errors.
    pub async fn cluster_connectivity(&self) -> Result<GateCheck> {
        let endpoint = join(self.cluster_url()?, "/admin/debug/node/ping");

        let (code, body) = match self.http_get(&endpoint).await {
            Err(e) => return Ok(GateCheck::blocked(e.to_string())),
            Ok(r) => r,
        };
        if !(200..300).contains(&(code as i32)) {
            return Ok(GateCheck::blocked(format!(
                "HTTP {code} ({})",
                truncate(&body, 200)
            )));
        }

        let ping: PingResponse = match serde_json::from_str(&body) {
            Err(_) => return Ok(GateCheck::blocked("invalid ping response: bad JSON")),
            Ok(p) => p,
        };
        if ping.result.is_empty() {
            return Ok(GateCheck::blocked("invalid ping response: empty result"));
        }

        for peer in &ping.result {
            let setup_err = summarize_error(&peer.setup_alive.error);
            let tcp_err = summarize_error(&peer.tcp_info.error);
            if !setup_err.is_empty() || !tcp_err.is_empty() {
                return Ok(GateCheck::blocked(format!(
                    "peer={} setup_err={setup_err:?} tcp_err={tcp_err:?}",
                    peer.url
                )));
            }
        }

        Ok(GateCheck::pass(""))
    }

    /// `GET {leader}/databases`: every enabled database with replication
    /// factor > 1 must have at least one usable member outside `excluded`.
    pub async fn databases_online(&self, excluded: &str) -> Result<GateCheck> {
        let endpoint = join(self.cluster_url()?, "/databases");

        let (code, body) = match self.http_get(&endpoint).await {
            Err(e) => return Ok(GateCheck::blocked(e.to_string())),
            Ok(r) => r,
        };
        if !(200..300).contains(&(code as i32)) {
            return Ok(GateCheck::blocked(format!(
                "HTTP {code} ({})",
                truncate(&body, 200)
            )));
        }

        let response: DatabasesResponse = match serde_json::from_str(&body) {
            Err(_) => return Ok(GateCheck::blocked("invalid /databases response")),
            Ok(r) => r,
        };
        if response.databases.is_empty() {
            return Ok(GateCheck::pass("no databases"));
        }

        for db in &response.databases {
            if db.disabled || db.replication_factor == 1 {
                continue;
            }

            let all_tags = pluck_tags(
                db.nodes_topology
                    .members
                    .iter()
                    .chain(&db.nodes_topology.promotables)
                    .chain(&db.nodes_topology.rehabs),
            );

            let mut ok_nodes: Vec<&str> = Vec::new();
            let mut first_non_ignored = String::new();

            for tag in &all_tags {
                if tag.eq_ignore_ascii_case(excluded) {
                    continue;
                }

                let status = db.nodes_topology.status.get(tag).cloned().unwrap_or_default();
                if status.last_status.trim().eq_ignore_ascii_case("ok") {
                    ok_nodes.push(tag);
                    continue;
                }

                if is_hard_load_error(&status.last_error) {
                    return Ok(GateCheck::blocked(format!(
                        "db={} node={tag} error={}",
                        db.name,
                        summarize_error(&status.last_error)
                    )));
                }

                if !status.last_error.is_empty()
                    && !is_ignored_transient(&status.last_error)
                    && first_non_ignored.is_empty()
                {
                    first_non_ignored = format!(
                        "db={} node={tag} error={}",
                        db.name,
                        summarize_error(&status.last_error)
                    );
                }
            }

            if !ok_nodes.is_empty() {
                continue;
            }

            if !first_non_ignored.is_empty() {
                return Ok(GateCheck::blocked(first_non_ignored));
            }

            return Ok(GateCheck::blocked(format!(
                "db={} reason=no usable member with LastStatus==Ok",
                db.name
            )));
        }

        Ok(GateCheck::pass(""))
    }
}

// ---------------------------------------------------------------------------
// wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct PingResponse {
    #[serde(rename = "Result", default)]
    result: Vec<PingItem>,
}

#[derive(Debug, Default, Deserialize)]
struct PingItem {
    #[serde(rename = "Url", default)]
    url: String,
    #[serde(rename = "SetupAlive", default)]
    setup_alive: PingError,
    #[serde(rename = "TcpInfo", default)]
    tcp_info: PingError,
}

#[derive(Debug, Default, Deserialize)]
struct PingError {
    #[serde(rename = "Error", default)]
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasesResponse {
    #[serde(rename = "Databases", default)]
    databases: Vec<DatabaseInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseInfo {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Disabled", default)]
    disabled: bool,
    #[serde(rename = "ReplicationFactor", default)]
    replication_factor: i64,
    #[serde(rename = "NodesTopology", default)]
    nodes_topology: NodesTopology,
}

#[derive(Debug, Default, Deserialize)]
struct NodesTopology {
    #[serde(rename = "Members", default)]
    members: Vec<TopologyNode>,
    #[serde(rename = "Promotables", default)]
    promotables: Vec<TopologyNode>,
    #[serde(rename = "Rehabs", default)]
    rehabs: Vec<TopologyNode>,
    #[serde(rename = "Status", default)]
    status: HashMap<String, DbStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct TopologyNode {
    #[serde(rename = "NodeTag", default)]
    node_tag: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct DbStatus {
    #[serde(rename = "LastStatus", default)]
    last_status: String,
    #[serde(rename = "LastError", default)]
    last_error: String,
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

const IGNORED_ERR_SNIPPETS: [&str; 5] = [
    "(status: loading)",
    "not responding",
    "connection refused",
    "serviceunavailable",
    "node in rehabilitation",
];

fn is_hard_load_error(s: &str) -> bool {
    s.to_lowercase().contains("endofstreamexception")
}

fn is_ignored_transient(s: &str) -> bool {
    let err = s.to_lowercase();
    IGNORED_ERR_SNIPPETS.iter().any(|sub| err.contains(sub))
}

/// Dedupe topology tags preserving first-seen order.
fn pluck_tags<'a>(nodes: impl Iterator<Item = &'a TopologyNode>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for node in nodes {
        let tag = node.node_tag.trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_string()) {
            out.push(tag.to_string());
        }
    }
    out
}

/// One-line error summary: drop inner exceptions, collapse whitespace and
/// truncate to 160 chars.
pub(crate) fn summarize_error(s: &str) -> String {
    let mut s = s.trim();
    if let Some(i) = s.find(" ---") {
        if i > 0 {
            s = &s[..i];
        }
    }
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");

    const MAX: usize = 160;
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() > MAX {
        let mut out: String = chars[..MAX].iter().collect();
        out.push('…');
        out
    } else {
        collapsed
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn truncate(s: &str, n: usize) -> String {
    if s.len() <= n {
        s.to_string()
    } else {
        s.chars().take(n).collect()
    }
}
