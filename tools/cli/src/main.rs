//! StreamCrypt CLI - Command line interface for streaming cryptography.
//!
//! Encrypts, decrypts and hashes files or stdin/stdout through the chunked
//! pipeline, derives keys from passwords, and manages Ed25519, RSA and
//! post-quantum key material.
//!
//! Exit status: 0 on success, 2 for rejected parameters, 3 when the data
//! fails to decrypt or authenticate, 130 on interrupt and 1 otherwise.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use streamcrypt_common::{Direction, EngineConfig, Error};
use streamcrypt_crypto::asymmetric::rsa::{self, RsaHash, RsaPrivateKey, RsaPublicKey, DEFAULT_RSA_BITS};
use streamcrypt_crypto::asymmetric::{generate_ed25519, sign, verify, SigningKey, VerifyingKey};
use streamcrypt_crypto::kdf::{Argon2Variant, Pbkdf2Prf};
use streamcrypt_crypto::keystore::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use streamcrypt_crypto::pqc::{self, KemPrivateKey, KemPublicKey, KemVariant};
use streamcrypt_crypto::transform::verify_digest;
use streamcrypt_crypto::{
    derive_argon2, derive_pbkdf2, load_private, load_public, save_private, save_public, Argon2Params,
    BlockCipher, BlockEngineKind, ChainingMode, CipherParameters, DigestKind, Hasher, PaddingScheme,
    ParameterBuilder, Pbkdf2Params, Pipeline, Protection, Salt, StreamCipher, StreamEngineKind,
};

#[derive(Parser)]
#[command(name = "streamcrypt")]
#[command(about = "StreamCrypt - Streaming encryption, hashing and key management")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON engine configuration (chunk size, pool capacity, progress interval).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct CipherArgs {
    /// Cipher name, e.g. "AES-256", "Serpent-128" or "XChaCha20".
    #[arg(long)]
    cipher: String,

    /// Chaining mode for block ciphers: ECB, CBC, CTR or GCM.
    #[arg(long, default_value = "CBC")]
    mode: String,

    /// Padding for ECB/CBC: None, PKCS7, ISO7816, ISO10126 or X923.
    #[arg(long)]
    padding: Option<String>,

    /// Key as hex.
    #[arg(long)]
    key_hex: String,

    /// IV (block modes) or nonce (stream ciphers) as hex.
    #[arg(long)]
    iv_hex: Option<String>,

    /// Additional authenticated data as hex (GCM only).
    #[arg(long)]
    aad_hex: Option<String>,

    /// Tag size in bytes (GCM only).
    #[arg(long)]
    tag_size: Option<usize>,

    /// Input file (default: stdin).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file or stdin.
    Encrypt(CipherArgs),

    /// Decrypt a file or stdin.
    Decrypt(CipherArgs),

    /// Hash a file or stdin.
    Hash {
        /// Digest algorithm, e.g. "SHA-256" or "BLAKE2b-512".
        #[arg(short, long, default_value = "SHA-256")]
        algorithm: String,

        /// Input file (default: stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Expected digest as hex; exits with an error on mismatch.
        #[arg(long)]
        expect: Option<String>,
    },

    /// Derive key material from a password.
    #[command(subcommand)]
    Derive(DeriveCommand),

    /// Generate an asymmetric key pair.
    #[command(subcommand)]
    Keygen(KeygenCommand),

    /// Sign a file with an Ed25519 private key.
    Sign {
        /// Private key PEM.
        #[arg(short, long)]
        key: PathBuf,

        /// File to sign.
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Verify an Ed25519 signature.
    Verify {
        /// Public key PEM.
        #[arg(short, long)]
        key: PathBuf,

        /// Signed file.
        #[arg(short, long)]
        input: PathBuf,

        /// Signature as hex.
        #[arg(short, long)]
        signature: String,
    },

    /// RSA-OAEP encryption and RSA-PSS signatures.
    #[command(subcommand)]
    Rsa(RsaCommand),

    /// ML-KEM key encapsulation.
    #[command(subcommand)]
    Kem(KemCommand),
}

#[derive(Subcommand)]
enum DeriveCommand {
    /// Argon2 derivation.
    Argon2 {
        /// Cost preset: "interactive", "moderate", or "sensitive".
        #[arg(short, long, default_value = "moderate")]
        strength: String,

        /// Argon2 flavour: argon2d, argon2i or argon2id.
        #[arg(long, default_value = "argon2id")]
        variant: String,

        /// Salt as hex (default: random, printed).
        #[arg(long)]
        salt_hex: Option<String>,

        /// Output length in bytes.
        #[arg(short, long, default_value_t = 32)]
        length: usize,
    },

    /// PBKDF2 derivation.
    Pbkdf2 {
        /// PRF: HMAC-SHA1, HMAC-SHA256 or HMAC-SHA512.
        #[arg(long, default_value = "HMAC-SHA256")]
        prf: String,

        #[arg(long, default_value_t = 600_000)]
        iterations: u32,

        /// Salt as hex (default: random, printed).
        #[arg(long)]
        salt_hex: Option<String>,

        /// Output length in bytes.
        #[arg(short, long, default_value_t = 32)]
        length: usize,
    },
}

#[derive(Subcommand)]
enum KeygenCommand {
    /// Ed25519 key pair written as <out>.pem and <out>.pub.pem.
    Ed25519 {
        /// Output path prefix.
        #[arg(short, long)]
        out: PathBuf,

        /// Protect the private key with a password.
        #[arg(long)]
        protect: bool,

        /// PBKDF2 iterations for a protected key.
        #[arg(long, default_value_t = streamcrypt_crypto::keystore::DEFAULT_PROTECTION_ITERATIONS)]
        iterations: u32,
    },

    /// RSA key pair written as <out>.pem and <out>.pub.pem.
    Rsa {
        /// Output path prefix.
        #[arg(short, long)]
        out: PathBuf,

        /// Modulus size in bits.
        #[arg(short, long, default_value_t = DEFAULT_RSA_BITS)]
        bits: usize,

        /// Protect the private key with a password.
        #[arg(long)]
        protect: bool,

        /// PBKDF2 iterations for a protected key.
        #[arg(long, default_value_t = streamcrypt_crypto::keystore::DEFAULT_PROTECTION_ITERATIONS)]
        iterations: u32,
    },
}

#[derive(Subcommand)]
enum RsaCommand {
    /// Encrypt a short message (such as a data key) to a public key.
    Encrypt {
        /// Public key PEM.
        #[arg(short, long)]
        key: PathBuf,

        /// OAEP hash: SHA-1, SHA-256, SHA-384 or SHA-512.
        #[arg(long, default_value = "SHA-256")]
        hash: String,

        /// Input file (default: stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt with a private key.
    Decrypt {
        /// Private key PEM.
        #[arg(short, long)]
        key: PathBuf,

        /// OAEP hash: SHA-1, SHA-256, SHA-384 or SHA-512.
        #[arg(long, default_value = "SHA-256")]
        hash: String,

        /// Input file (default: stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign a file with PSS.
    Sign {
        /// Private key PEM.
        #[arg(short, long)]
        key: PathBuf,

        /// PSS hash.
        #[arg(long, default_value = "SHA-256")]
        hash: String,

        /// File to sign.
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Verify a PSS signature.
    Verify {
        /// Public key PEM.
        #[arg(short, long)]
        key: PathBuf,

        /// PSS hash.
        #[arg(long, default_value = "SHA-256")]
        hash: String,

        /// Signed file.
        #[arg(short, long)]
        input: PathBuf,

        /// Signature as hex.
        #[arg(short, long)]
        signature: String,
    },
}

#[derive(Subcommand)]
enum KemCommand {
    /// Generate a key pair written as hex to <out>.pub and <out>.key.
    Keygen {
        #[arg(long, default_value = "ML-KEM-768")]
        variant: String,

        /// Output path prefix.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Encapsulate a fresh shared secret to a public key.
    Encap {
        #[arg(long, default_value = "ML-KEM-768")]
        variant: String,

        /// Public key file (hex).
        #[arg(short, long)]
        public: PathBuf,
    },

    /// Recover the shared secret from a ciphertext.
    Decap {
        #[arg(long, default_value = "ML-KEM-768")]
        variant: String,

        /// Private key file (hex).
        #[arg(short = 'k', long)]
        private: PathBuf,

        /// Ciphertext as hex.
        #[arg(long)]
        ciphertext_hex: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging on stderr
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: {}", err);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_status(&err))
        }
    }
}

/// Map a failure to the process exit status.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::Cancelled) => 130,
        Some(err) if err.is_validation() => 2,
        Some(err) if err.is_data_dependent() => 3,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let pipeline = build_pipeline(cli.config.as_deref())?;

    let token = pipeline.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    match cli.command {
        Commands::Encrypt(args) => cmd_cipher(&args, Direction::Encrypt, pipeline),
        Commands::Decrypt(args) => cmd_cipher(&args, Direction::Decrypt, pipeline),
        Commands::Hash {
            algorithm,
            input,
            expect,
        } => cmd_hash(&algorithm, input.as_deref(), expect.as_deref(), pipeline).await,
        Commands::Derive(command) => cmd_derive(command),
        Commands::Keygen(KeygenCommand::Ed25519 {
            out,
            protect,
            iterations,
        }) => cmd_keygen_ed25519(&out, protect, iterations),
        Commands::Keygen(KeygenCommand::Rsa {
            out,
            bits,
            protect,
            iterations,
        }) => cmd_keygen_rsa(&out, bits, protect, iterations),
        Commands::Sign { key, input } => cmd_sign(&key, &input),
        Commands::Verify {
            key,
            input,
            signature,
        } => cmd_verify(&key, &input, &signature),
        Commands::Rsa(command) => cmd_rsa(command),
        Commands::Kem(command) => cmd_kem(command),
    }
}

/// Load the engine configuration, or fall back to defaults.
fn build_pipeline(config: Option<&Path>) -> Result<Pipeline> {
    let config = match config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!(chunk_size = config.chunk_size, "Engine configuration loaded");

    let pipeline = Pipeline::new(config).context("Invalid engine configuration")?;
    Ok(pipeline.with_progress(Arc::new(|bytes: u64| debug!(bytes, "Progress"))))
}

/// Prompt for password securely.
fn prompt_password(prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Zeroizing::new(password.into_bytes()))
}

/// Prompt twice and require a non-empty match.
fn prompt_new_password() -> Result<Zeroizing<Vec<u8>>> {
    let password = prompt_password("Enter password: ")?;
    let confirm = prompt_password("Confirm password: ")?;

    if password != confirm {
        bail!("Passwords do not match");
    }

    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    Ok(password)
}

fn decode_hex(value: &str, what: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim()).with_context(|| format!("{} is not valid hex", what))
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// The cipher selected on the command line with its validated parameters.
enum SelectedCipher {
    Block(BlockCipher),
    Stream(StreamCipher),
}

fn select_cipher(args: &CipherArgs, pipeline: Pipeline) -> Result<(SelectedCipher, CipherParameters)> {
    let key = Zeroizing::new(decode_hex(&args.key_hex, "--key-hex")?);
    let iv = args.iv_hex.as_deref().map(|v| decode_hex(v, "--iv-hex")).transpose()?;

    if let Ok(engine) = args.cipher.parse::<StreamEngineKind>() {
        if args.aad_hex.is_some() || args.tag_size.is_some() {
            bail!("{} is not an AEAD cipher; --aad-hex and --tag-size do not apply", engine);
        }
        let nonce = iv.context("--iv-hex is required for stream ciphers")?;
        let params = ParameterBuilder::for_stream(engine).key(&key).nonce(&nonce).build()?;
        let cipher = StreamCipher::new(engine).with_pipeline(pipeline);
        return Ok((SelectedCipher::Stream(cipher), params));
    }

    let mode: ChainingMode = args.mode.parse()?;
    let engine = match args.cipher.parse::<BlockEngineKind>() {
        Ok(engine) => engine,
        Err(_) => BlockEngineKind::for_family(&args.cipher, key.len())?,
    };
    let padding = match &args.padding {
        Some(padding) => padding.parse()?,
        None if mode.is_block_aligned() => PaddingScheme::Pkcs7,
        None => PaddingScheme::None,
    };

    let cipher = BlockCipher::new(engine, mode, padding).with_pipeline(pipeline);
    let mut builder = cipher.parameters().key(&key);
    if let Some(iv) = &iv {
        builder = builder.iv(iv);
    }
    if let Some(aad) = &args.aad_hex {
        builder = builder.aad(&decode_hex(aad, "--aad-hex")?);
    }
    if let Some(tag_size) = args.tag_size {
        builder = builder.tag_size(tag_size);
    }
    let params = builder.build()?;
    Ok((SelectedCipher::Block(cipher), params))
}

/// Encrypt or decrypt between files or stdin/stdout.
fn cmd_cipher(args: &CipherArgs, direction: Direction, pipeline: Pipeline) -> Result<()> {
    let (cipher, params) = select_cipher(args, pipeline)?;
    info!("{} with {}", direction, params.suite());

    let reader = open_input(args.input.as_deref())?;
    let writer = open_output(args.output.as_deref())?;

    let bytes = match (cipher, direction) {
        (SelectedCipher::Block(c), Direction::Encrypt) => c.encrypt(reader, writer, &params),
        (SelectedCipher::Block(c), Direction::Decrypt) => c.decrypt(reader, writer, &params),
        (SelectedCipher::Stream(c), Direction::Encrypt) => c.encrypt(reader, writer, &params),
        (SelectedCipher::Stream(c), Direction::Decrypt) => c.decrypt(reader, writer, &params),
    }
    .with_context(|| format!("Failed to {} input", direction))?;

    info!("Processed {} bytes", bytes);
    Ok(())
}

/// Hash a file (asynchronously) or stdin.
async fn cmd_hash(algorithm: &str, input: Option<&Path>, expect: Option<&str>, pipeline: Pipeline) -> Result<()> {
    let kind: DigestKind = algorithm.parse()?;
    let hasher = Hasher::new(kind).with_pipeline(pipeline);

    let digest = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            hasher.hash_async(file, None).await
        }
        None => hasher.hash(io::stdin().lock(), None),
    }
    .context("Failed to hash input")?;

    if let Some(expected) = expect {
        let expected = decode_hex(expected, "--expect")?;
        if !verify_digest(&expected, &digest) {
            bail!("{} digest mismatch", kind);
        }
        info!("{} digest matches", kind);
    }

    println!("{}", hex::encode(digest));
    Ok(())
}

fn salt_or_random(salt_hex: Option<&str>) -> Result<Salt> {
    match salt_hex {
        Some(salt) => Ok(Salt::from_bytes(&decode_hex(salt, "--salt-hex")?)),
        None => {
            let salt = Salt::generate();
            println!("salt: {}", hex::encode(salt.as_bytes()));
            Ok(salt)
        }
    }
}

fn argon2_preset(strength: &str) -> Result<Argon2Params> {
    match strength {
        "interactive" => Ok(Argon2Params::interactive()),
        "moderate" => Ok(Argon2Params::moderate()),
        "sensitive" => Ok(Argon2Params::sensitive()),
        _ => bail!("Invalid strength. Use: interactive, moderate, or sensitive"),
    }
}

fn cmd_derive(command: DeriveCommand) -> Result<()> {
    let password = prompt_password("Enter password: ")?;

    let key = match command {
        DeriveCommand::Argon2 {
            strength,
            variant,
            salt_hex,
            length,
        } => {
            let params = Argon2Params {
                variant: variant.parse::<Argon2Variant>()?,
                ..argon2_preset(&strength)?.with_output_len(length)
            };
            let salt = salt_or_random(salt_hex.as_deref())?;
            derive_argon2(&password, salt.as_bytes(), &params).context("Argon2 derivation failed")?
        }
        DeriveCommand::Pbkdf2 {
            prf,
            iterations,
            salt_hex,
            length,
        } => {
            let params = Pbkdf2Params {
                prf: prf.parse::<Pbkdf2Prf>()?,
                iterations,
                output_len: length,
            };
            let salt = salt_or_random(salt_hex.as_deref())?;
            derive_pbkdf2(&password, salt.as_bytes(), &params).context("PBKDF2 derivation failed")?
        }
    };

    println!("key: {}", hex::encode(&key[..]));
    Ok(())
}

fn key_paths(out: &Path) -> (PathBuf, PathBuf) {
    let prefix = out.to_string_lossy();
    (
        PathBuf::from(format!("{}.pem", prefix)),
        PathBuf::from(format!("{}.pub.pem", prefix)),
    )
}

/// Write `<out>.pem` and `<out>.pub.pem`, returning both paths.
fn write_key_pair<S: EncodePrivateKey, P: EncodePublicKey>(
    private_key: &S,
    public_key: &P,
    out: &Path,
    protection: Option<&Protection>,
) -> Result<(PathBuf, PathBuf)> {
    let (private_path, public_path) = key_paths(out);

    let private = File::create(&private_path)
        .with_context(|| format!("Failed to create {}", private_path.display()))?;
    save_private(private_key, private, protection).context("Failed to write private key")?;

    let public = File::create(&public_path)
        .with_context(|| format!("Failed to create {}", public_path.display()))?;
    save_public(public_key, public).context("Failed to write public key")?;

    Ok((private_path, public_path))
}

fn prompt_protection(protect: bool) -> Result<Option<Zeroizing<Vec<u8>>>> {
    if protect {
        Ok(Some(prompt_new_password()?))
    } else {
        Ok(None)
    }
}

fn report_key_pair(private_path: &Path, public_path: &Path) {
    println!("Key pair created successfully!");
    println!("  Private: {}", private_path.display());
    println!("  Public:  {}", public_path.display());
}

fn cmd_keygen_ed25519(out: &Path, protect: bool, iterations: u32) -> Result<()> {
    let key = generate_ed25519();
    let password = prompt_protection(protect)?;
    let protection = password
        .as_ref()
        .map(|password| Protection::new(password).with_iterations(iterations));

    let (private_path, public_path) = write_key_pair(&key, &key.verifying_key(), out, protection.as_ref())?;
    report_key_pair(&private_path, &public_path);
    Ok(())
}

fn cmd_keygen_rsa(out: &Path, bits: usize, protect: bool, iterations: u32) -> Result<()> {
    let password = prompt_protection(protect)?;
    let protection = password
        .as_ref()
        .map(|password| Protection::new(password).with_iterations(iterations));

    info!("Generating {}-bit RSA key", bits);
    let key = rsa::generate_rsa(bits)?;
    let (private_path, public_path) = write_key_pair(&key, &key.to_public_key(), out, protection.as_ref())?;
    report_key_pair(&private_path, &public_path);
    Ok(())
}

fn read_private_key<K: DecodePrivateKey>(path: &Path) -> Result<K> {
    let text = Zeroizing::new(
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
    );
    let key = if text.contains(streamcrypt_crypto::keystore::ENCRYPTED_PRIVATE_KEY_LABEL) {
        let password = prompt_password("Enter key password: ")?;
        load_private(text.as_bytes(), Some(password.as_slice()))
    } else {
        load_private(text.as_bytes(), None)
    };
    key.context("Failed to load private key")
}

fn read_public_key<K: DecodePublicKey>(path: &Path) -> Result<K> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    load_public(file).context("Failed to load public key")
}

fn cmd_sign(key: &Path, input: &Path) -> Result<()> {
    let key: SigningKey = read_private_key(key)?;
    let message = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    println!("{}", hex::encode(sign(&message, &key)));
    Ok(())
}

fn cmd_verify(key: &Path, input: &Path, signature: &str) -> Result<()> {
    let key: VerifyingKey = read_public_key(key)?;
    let message = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let signature = decode_hex(signature, "--signature")?;

    if !verify(&message, &signature, &key) {
        bail!("Signature is not valid");
    }
    println!("Signature OK");
    Ok(())
}

fn read_all(path: Option<&Path>) -> Result<Zeroizing<Vec<u8>>> {
    let mut data = Zeroizing::new(Vec::new());
    open_input(path)?.read_to_end(&mut data).context("Failed to read input")?;
    Ok(data)
}

fn cmd_rsa(command: RsaCommand) -> Result<()> {
    match command {
        RsaCommand::Encrypt {
            key,
            hash,
            input,
            output,
        } => {
            let hash: RsaHash = hash.parse()?;
            let key: RsaPublicKey = read_public_key(&key)?;
            let message = read_all(input.as_deref())?;
            let ciphertext = rsa::encrypt_oaep(&message, &key, hash)?;

            let mut writer = open_output(output.as_deref())?;
            writer.write_all(&ciphertext)?;
            writer.flush()?;
            info!("Encrypted {} bytes with RSA-OAEP/{}", message.len(), hash);
        }
        RsaCommand::Decrypt {
            key,
            hash,
            input,
            output,
        } => {
            let hash: RsaHash = hash.parse()?;
            let key: RsaPrivateKey = read_private_key(&key)?;
            let ciphertext = read_all(input.as_deref())?;
            let message = rsa::decrypt_oaep(&ciphertext, &key, hash)?;

            let mut writer = open_output(output.as_deref())?;
            writer.write_all(&message)?;
            writer.flush()?;
        }
        RsaCommand::Sign { key, hash, input } => {
            let hash: RsaHash = hash.parse()?;
            let key: RsaPrivateKey = read_private_key(&key)?;
            let message = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
            println!("{}", hex::encode(rsa::sign_pss(&message, &key, hash)?));
        }
        RsaCommand::Verify {
            key,
            hash,
            input,
            signature,
        } => {
            let hash: RsaHash = hash.parse()?;
            let key: RsaPublicKey = read_public_key(&key)?;
            let message = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
            let signature = decode_hex(&signature, "--signature")?;

            if !rsa::verify_pss(&message, &signature, &key, hash) {
                bail!("Signature is not valid");
            }
            println!("Signature OK");
        }
    }
    Ok(())
}

fn read_hex_file(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let text = Zeroizing::new(
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
    );
    Ok(Zeroizing::new(decode_hex(&text, &path.display().to_string())?))
}

fn cmd_kem(command: KemCommand) -> Result<()> {
    match command {
        KemCommand::Keygen { variant, out } => {
            let variant: KemVariant = variant.parse()?;
            let (public, private) = pqc::generate_kem_keypair(variant)?;

            let prefix = out.to_string_lossy();
            let public_path = PathBuf::from(format!("{}.pub", prefix));
            let private_path = PathBuf::from(format!("{}.key", prefix));
            std::fs::write(&public_path, hex::encode(public.as_bytes()))
                .with_context(|| format!("Failed to write {}", public_path.display()))?;
            std::fs::write(&private_path, Zeroizing::new(hex::encode(private.as_bytes())).as_bytes())
                .with_context(|| format!("Failed to write {}", private_path.display()))?;

            println!("{} key pair created successfully!", variant);
            println!("  Private: {}", private_path.display());
            println!("  Public:  {}", public_path.display());
        }
        KemCommand::Encap { variant, public } => {
            let variant: KemVariant = variant.parse()?;
            let public = KemPublicKey::from_bytes(variant, &read_hex_file(&public)?)?;
            let sent = pqc::encapsulate(&public)?;
            println!("ciphertext: {}", hex::encode(&sent.ciphertext));
            println!("secret: {}", hex::encode(sent.shared_secret.as_bytes()));
        }
        KemCommand::Decap {
            variant,
            private,
            ciphertext_hex,
        } => {
            let variant: KemVariant = variant.parse()?;
            let private = KemPrivateKey::from_bytes(variant, &read_hex_file(&private)?)?;
            let ciphertext = decode_hex(&ciphertext_hex, "--ciphertext-hex")?;
            let secret = pqc::decapsulate(&ciphertext, &private)?;
            println!("secret: {}", hex::encode(secret.as_bytes()));
        }
    }
    Ok(())
}
