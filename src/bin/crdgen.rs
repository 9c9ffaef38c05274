use kube::CustomResourceExt;
use ravendb_operator::crd::RavenDBCluster;

fn main() {
    print!("{}", serde_yaml::to_string(&RavenDBCluster::crd()).unwrap());
}
