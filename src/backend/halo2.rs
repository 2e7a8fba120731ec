//! Halo2 IPA backend and its proving artifacts
//!
//! Artifacts live in a directory:
//!
//! ```text
//! <dir>/params.bin     IPA parameters (Params<EqAffine>::write)
//! <dir>/manifest.json  ArtifactManifest
//! ```
//!
//! The proving and verifying keys are regenerated from the parameters on
//! load; the manifest pins a digest of the verifying key so that a circuit
//! change is caught as a mismatch instead of producing unverifiable proofs.

use blake2::{Blake2b512, Digest};
use chrono::{DateTime, Utc};
use halo2_proofs::{
    pasta::EqAffine,
    plonk::{create_proof, keygen_pk, keygen_vk, verify_proof, ProvingKey, SingleVerifier},
    poly::commitment::Params,
    transcript::{Blake2bRead, Blake2bWrite, Challenge255},
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::{BackendError, Proof, ProofBackend, ProofVerifier};
use crate::circuit::TransferCircuit;
use crate::constants::{domains, CIRCUIT_VERSION};
use crate::transfer::{PublicSignals, TransferWitness};

pub const PARAMS_FILE: &str = "params.bin";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// Errors creating, storing or loading proving artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("proving artifact missing: {}", .0.display())]
    Missing(PathBuf),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode parameters: {0}")]
    Encode(#[source] io::Error),
    #[error("malformed manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("incompatible artifacts: {0}")]
    Incompatible(String),
    #[error("{label} digest mismatch, manifest recorded {expected} but computed {actual}")]
    DigestMismatch {
        label: &'static str,
        expected: String,
        actual: String,
    },
    #[error("key generation failed: {0}")]
    Keygen(String),
}

/// Describes a stored artifact set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub manifest_version: u32,
    pub circuit_version: u32,
    pub k: u32,
    pub created_at: DateTime<Utc>,
    pub params_file: String,
    pub params_size: u64,
    pub params_blake2b: String,
    pub vk_blake2b: String,
}

/// Parameters and keys for the transfer circuit
pub struct ProvingArtifacts {
    manifest: ArtifactManifest,
    params: Params<EqAffine>,
    pk: ProvingKey<EqAffine>,
}

impl ProvingArtifacts {
    /// Generate fresh parameters for `2^k` rows and derive the keys
    pub fn setup(k: u32) -> Result<Self, ArtifactError> {
        info!(k, "generating proving artifacts");
        let params: Params<EqAffine> = Params::new(k);
        let params_bytes = encode_params(&params)?;
        let pk = keygen(&params)?;

        let manifest = ArtifactManifest {
            manifest_version: MANIFEST_VERSION,
            circuit_version: CIRCUIT_VERSION,
            k,
            created_at: Utc::now(),
            params_file: PARAMS_FILE.to_string(),
            params_size: params_bytes.len() as u64,
            params_blake2b: digest_hex(&params_bytes),
            vk_blake2b: vk_digest(&pk),
        };

        Ok(Self {
            manifest,
            params,
            pk,
        })
    }

    /// Store the artifacts under `dir`, creating it if needed
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let params_path = dir.join(&self.manifest.params_file);
        let params_bytes = encode_params(&self.params)?;
        fs::write(&params_path, params_bytes).map_err(|source| ArtifactError::Io {
            path: params_path.clone(),
            source,
        })?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(&self.manifest)?;
        fs::write(&manifest_path, json).map_err(|source| ArtifactError::Io {
            path: manifest_path.clone(),
            source,
        })?;

        info!(dir = %dir.display(), k = self.manifest.k, "wrote proving artifacts");
        Ok(())
    }

    /// Load and check artifacts previously stored with [`Self::write_to`]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: ArtifactManifest = serde_json::from_slice(&read_file(&manifest_path)?)?;
        ensure_compatible(&manifest)?;

        let params_path = dir.join(bare_file_name(&manifest.params_file)?);
        let params_bytes = read_file(&params_path)?;
        if params_bytes.len() as u64 != manifest.params_size {
            return Err(ArtifactError::Incompatible(format!(
                "params size mismatch, manifest recorded {} bytes but found {}",
                manifest.params_size,
                params_bytes.len()
            )));
        }
        ensure_digest("params", &manifest.params_blake2b, digest_hex(&params_bytes))?;
        match encoded_k(&params_bytes) {
            Some(k) if k == manifest.k => {}
            found => {
                return Err(ArtifactError::Incompatible(format!(
                    "params are for k = {:?}, manifest records k = {}",
                    found, manifest.k
                )))
            }
        }

        let params = Params::<EqAffine>::read(&mut &params_bytes[..])
            .map_err(|e| ArtifactError::Incompatible(format!("unreadable params: {}", e)))?;

        let pk = keygen(&params)?;
        ensure_digest("verifying key", &manifest.vk_blake2b, vk_digest(&pk))?;

        debug!(dir = %dir.display(), k = manifest.k, "loaded proving artifacts");
        Ok(Self {
            manifest,
            params,
            pk,
        })
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn k(&self) -> u32 {
        self.manifest.k
    }
}

fn keygen(params: &Params<EqAffine>) -> Result<ProvingKey<EqAffine>, ArtifactError> {
    let empty = TransferCircuit::empty();
    let vk = keygen_vk(params, &empty)
        .map_err(|e| ArtifactError::Keygen(format!("verifying key: {:?}", e)))?;
    keygen_pk(params, vk, &empty).map_err(|e| ArtifactError::Keygen(format!("proving key: {:?}", e)))
}

fn encode_params(params: &Params<EqAffine>) -> Result<Vec<u8>, ArtifactError> {
    let mut buf = Vec::new();
    params.write(&mut buf).map_err(ArtifactError::Encode)?;
    Ok(buf)
}

/// `k` as written at the head of encoded params (little-endian u32)
fn encoded_k(params_bytes: &[u8]) -> Option<u32> {
    let head: [u8; 4] = params_bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(head))
}

/// Manifest file names must stay inside the artifact directory
fn bare_file_name(name: &str) -> Result<&Path, ArtifactError> {
    let path = Path::new(name);
    match path.file_name() {
        Some(file) if file == path.as_os_str() => Ok(path),
        _ => Err(ArtifactError::Incompatible(format!(
            "params file {:?} is not a plain file name",
            name
        ))),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ArtifactError::Missing(path.to_path_buf()),
        _ => ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn digest_hex(bytes: &[u8]) -> String {
    let digest = Blake2b512::new()
        .chain_update(domains::ARTIFACT)
        .chain_update(bytes)
        .finalize();
    hex::encode(&digest[..32])
}

/// Digest of the pinned verifying key (domain, fixed commitments,
/// permutation), which changes whenever the constraint system does
fn vk_digest(pk: &ProvingKey<EqAffine>) -> String {
    digest_hex(format!("{:?}", pk.get_vk().pinned()).as_bytes())
}

fn ensure_digest(label: &'static str, expected: &str, actual: String) -> Result<(), ArtifactError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ArtifactError::DigestMismatch {
            label,
            expected: expected.to_string(),
            actual,
        })
    }
}

fn ensure_compatible(manifest: &ArtifactManifest) -> Result<(), ArtifactError> {
    if manifest.manifest_version != MANIFEST_VERSION {
        return Err(ArtifactError::Incompatible(format!(
            "unsupported manifest version {}, expected {}",
            manifest.manifest_version, MANIFEST_VERSION
        )));
    }
    if manifest.circuit_version != CIRCUIT_VERSION {
        return Err(ArtifactError::Incompatible(format!(
            "circuit version mismatch: manifest {} vs crate {}",
            manifest.circuit_version, CIRCUIT_VERSION
        )));
    }
    Ok(())
}

/// Real halo2 proofs over the transfer circuit.
///
/// Proofs are IPA transcripts; every element is a 32-byte point or scalar,
/// so the length is always a whole number of words, but the word count
/// depends on the circuit shape and is not fixed.
#[derive(Clone)]
pub struct Halo2Backend {
    artifacts: Arc<ProvingArtifacts>,
}

impl Halo2Backend {
    pub fn new(artifacts: Arc<ProvingArtifacts>) -> Self {
        Self { artifacts }
    }

    /// Backend over the artifacts stored under `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, BackendError> {
        let artifacts = ProvingArtifacts::load(dir)?;
        Ok(Self::new(Arc::new(artifacts)))
    }

    pub fn artifacts(&self) -> &ProvingArtifacts {
        &self.artifacts
    }
}

impl ProofVerifier for Halo2Backend {
    fn verify(&self, signals: &PublicSignals, proof: &Proof) -> Result<bool, BackendError> {
        let instance = signals.to_fields();
        let strategy = SingleVerifier::new(&self.artifacts.params);
        let mut transcript = Blake2bRead::<_, _, Challenge255<_>>::init(proof.as_bytes());

        match verify_proof(
            &self.artifacts.params,
            self.artifacts.pk.get_vk(),
            strategy,
            &[&[&instance[..]]],
            &mut transcript,
        ) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!(error = ?e, proof_len = proof.len(), "halo2 verification failed");
                Ok(false)
            }
        }
    }
}

impl ProofBackend for Halo2Backend {
    fn prove(&self, witness: &TransferWitness) -> Result<(Proof, PublicSignals), BackendError> {
        let signals = witness.public_signals()?;
        let instance = signals.to_fields();
        let circuit = TransferCircuit::new(witness.clone());

        let mut transcript = Blake2bWrite::<_, EqAffine, Challenge255<_>>::init(vec![]);
        create_proof(
            &self.artifacts.params,
            &self.artifacts.pk,
            &[circuit],
            &[&[&instance[..]]],
            OsRng,
            &mut transcript,
        )
        .map_err(|e| BackendError::Synthesis(format!("{:?}", e)))?;

        Ok((Proof::from_bytes(transcript.finalize()), signals))
    }
}
