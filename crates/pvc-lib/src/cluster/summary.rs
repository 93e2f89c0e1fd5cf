//! Wire types of the kubelet stats summary (`/stats/summary`)
//!
//! Only the fields needed for claim usage are decoded; everything else in
//! the payload is ignored.

use crate::models::{ClaimRef, VolumeStat};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub pods: Vec<SummaryPod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryPod {
    #[serde(default, rename = "volume")]
    pub volumes: Vec<SummaryVolume>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryVolume {
    #[serde(default)]
    pub pvc_ref: Option<PvcRef>,
    #[serde(default)]
    pub capacity_bytes: Option<u64>,
    #[serde(default)]
    pub used_bytes: Option<u64>,
    #[serde(default)]
    pub available_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PvcRef {
    pub namespace: String,
    pub name: String,
}

impl Summary {
    /// Flatten every pod's volumes into stats rows
    pub fn into_volume_stats(self) -> Vec<VolumeStat> {
        self.pods
            .into_iter()
            .flat_map(|pod| pod.volumes)
            .map(|vol| VolumeStat {
                claim: vol.pvc_ref.map(|r| ClaimRef::new(r.namespace, r.name)),
                capacity_bytes: vol.capacity_bytes.unwrap_or(0),
                used_bytes: vol.used_bytes.unwrap_or(0),
                available_bytes: vol.available_bytes.unwrap_or(0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"{
        "node": {"nodeName": "worker-1"},
        "pods": [
            {
                "podRef": {"name": "kafka-0", "namespace": "streaming"},
                "volume": [
                    {
                        "name": "data",
                        "pvcRef": {"name": "data-0-kafka", "namespace": "streaming"},
                        "capacityBytes": 1000,
                        "usedBytes": 250,
                        "availableBytes": 750
                    },
                    {
                        "name": "kube-api-access",
                        "capacityBytes": 500,
                        "usedBytes": 10,
                        "availableBytes": 490
                    }
                ]
            },
            {
                "podRef": {"name": "no-volumes", "namespace": "default"}
            }
        ]
    }"#;

    #[test]
    fn test_decode_summary() {
        let summary: Summary = serde_json::from_str(SUMMARY).unwrap();
        assert_eq!(summary.pods.len(), 2);

        let stats = summary.into_volume_stats();
        assert_eq!(stats.len(), 2);

        let claim = stats[0].claim.as_ref().unwrap();
        assert_eq!(claim.namespace, "streaming");
        assert_eq!(claim.name, "data-0-kafka");
        assert_eq!(stats[0].capacity_bytes, 1000);
        assert_eq!(stats[0].used_bytes, 250);
        assert_eq!(stats[0].available_bytes, 750);

        assert!(stats[1].claim.is_none());
    }

    #[test]
    fn test_decode_missing_byte_counts() {
        let raw = r#"{"pods":[{"volume":[{"pvcRef":{"name":"a","namespace":"b"}}]}]}"#;
        let stats = serde_json::from_str::<Summary>(raw)
            .unwrap()
            .into_volume_stats();
        assert_eq!(stats[0].capacity_bytes, 0);
    }
}
