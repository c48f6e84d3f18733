//! Prints the Nginx CRD manifest as YAML.
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crd/nginxes.yaml
//! ```

use crds::Nginx;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Nginx::crd())?);
    Ok(())
}
