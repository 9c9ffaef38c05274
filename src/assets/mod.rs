//! Shell hooks shipped inside the operator binary and published to the
//! cluster through configmaps. The bootstrap hooks join nodes into a logical
//! cluster; the cert hooks let the server load and rotate its certificate.

pub const INIT_CLUSTER_SCRIPT: &str = include_str!("init-cluster.sh");
pub const CHECK_NODES_DISCOVERABILITY_SCRIPT: &str =
    include_str!("check-nodes-discoverability.sh");
pub const UPDATE_CERT_SCRIPT: &str = include_str!("update-cert.sh");
pub const GET_SERVER_CERT_SCRIPT: &str = include_str!("get-server-cert.sh");
