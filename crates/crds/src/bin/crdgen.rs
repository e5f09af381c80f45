//! Prints the operator's CRD manifests as a multi-document YAML stream.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/bases/registry.devfile.io.yaml`

use crds::{ClusterDevfileRegistriesList, DevfileRegistriesList, DevfileRegistry};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let manifests = [
        DevfileRegistry::crd(),
        DevfileRegistriesList::crd(),
        ClusterDevfileRegistriesList::crd(),
    ];

    for crd in manifests {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }

    Ok(())
}
