//! Property tests: output never depends on how input is chunked.

use proptest::prelude::*;
use streamcrypt_common::{Direction, EngineConfig, Error};
use streamcrypt_crypto::transform::Transform;
use streamcrypt_crypto::{
    create_transform, BlockCipher, BlockEngineKind, ChainingMode, CipherParameters, DigestKind, Hasher, PaddingScheme,
    ParameterBuilder, Pipeline, PrimitiveProvider, StreamCipher, StreamEngineKind,
};

fn block_suites() -> impl Strategy<Value = (BlockEngineKind, ChainingMode, PaddingScheme)> {
    (
        prop::sample::select(BlockEngineKind::ALL.to_vec()),
        prop::sample::select(vec![
            (ChainingMode::Ecb, PaddingScheme::Pkcs7),
            (ChainingMode::Ecb, PaddingScheme::Iso7816),
            (ChainingMode::Cbc, PaddingScheme::Pkcs7),
            (ChainingMode::Cbc, PaddingScheme::X923),
            (ChainingMode::Ctr, PaddingScheme::None),
            (ChainingMode::Gcm, PaddingScheme::None),
        ]),
    )
        .prop_map(|(engine, (mode, padding))| (engine, mode, padding))
}

fn block_params(
    engine: BlockEngineKind,
    mode: ChainingMode,
    padding: PaddingScheme,
    seed: u8,
) -> CipherParameters {
    let key: Vec<u8> = (0..engine.key_size()).map(|i| seed.wrapping_add(i as u8)).collect();
    let mut builder = ParameterBuilder::for_block(engine, mode, padding).key(&key);
    builder = match mode {
        ChainingMode::Ecb => builder,
        ChainingMode::Gcm => builder.iv(&[seed; 12]).aad(b"header"),
        _ => builder.iv(&[seed ^ 0x5A; 16]),
    };
    builder.build().unwrap()
}

fn pipeline(chunk: usize) -> Pipeline {
    Pipeline::new(EngineConfig::new(chunk)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn block_round_trip_is_chunk_independent(
        (engine, mode, padding) in block_suites(),
        data in prop::collection::vec(any::<u8>(), 0..2048),
        chunk in 1usize..100,
        seed in any::<u8>(),
    ) {
        let params = block_params(engine, mode, padding, seed);
        let whole = BlockCipher::new(engine, mode, padding);
        let chunked = BlockCipher::new(engine, mode, padding).with_pipeline(pipeline(chunk));

        let reference = whole.encrypt_bytes(&data, &params).unwrap();
        let mut ciphertext = Vec::new();
        chunked.encrypt(&data[..], &mut ciphertext, &params).unwrap();
        prop_assert_eq!(&ciphertext, &reference);

        let mut plaintext = Vec::new();
        chunked.decrypt(&ciphertext[..], &mut plaintext, &params).unwrap();
        prop_assert_eq!(plaintext, data);
    }

    #[test]
    fn stream_round_trip_is_chunk_independent(
        engine in prop::sample::select(vec![
            StreamEngineKind::ChaCha20,
            StreamEngineKind::ChaCha20Legacy,
            StreamEngineKind::XChaCha20,
            StreamEngineKind::Salsa20,
            StreamEngineKind::XSalsa20,
        ]),
        data in prop::collection::vec(any::<u8>(), 0..2048),
        chunk in 1usize..100,
    ) {
        let params = ParameterBuilder::for_stream(engine)
            .key(&[0x24; 32])
            .nonce(&vec![0x11; engine.nonce_size()])
            .build()
            .unwrap();
        let cipher = StreamCipher::new(engine).with_pipeline(pipeline(chunk));

        let mut ciphertext = Vec::new();
        cipher.encrypt(&data[..], &mut ciphertext, &params).unwrap();
        prop_assert_eq!(&ciphertext, &StreamCipher::new(engine).encrypt_bytes(&data, &params).unwrap());
        prop_assert_eq!(&cipher.decrypt_bytes(&ciphertext, &params).unwrap()[..], &data[..]);
    }

    #[test]
    fn digest_is_chunk_independent(
        kind in prop::sample::select(vec![
            DigestKind::Sha1,
            DigestKind::Sha256,
            DigestKind::Sha512,
            DigestKind::Sha3_256,
            DigestKind::Blake2s256,
        ]),
        data in prop::collection::vec(any::<u8>(), 0..4096),
        chunk in 1usize..4097,
    ) {
        let one_byte = Hasher::new(kind).with_pipeline(pipeline(1)).hash_bytes(&data).unwrap();
        let chunked = Hasher::new(kind).with_pipeline(pipeline(chunk)).hash_bytes(&data).unwrap();
        prop_assert_eq!(one_byte, chunked);
    }

    #[test]
    fn arbitrary_update_splits_match(
        (engine, mode, padding) in block_suites(),
        data in prop::collection::vec(any::<u8>(), 0..512),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let provider = PrimitiveProvider::with_defaults();
        let params = block_params(engine, mode, padding, 7);

        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(data.len() + 1)).collect();
        points.push(0);
        points.push(data.len());
        points.sort_unstable();

        let mut split = create_transform(&provider, &params, Direction::Encrypt).unwrap();
        let mut out = Vec::new();
        for window in points.windows(2) {
            split.update(&data[window[0]..window[1]], &mut out).unwrap();
        }
        split.finalize(&mut out).unwrap();

        let mut whole = create_transform(&provider, &params, Direction::Encrypt).unwrap();
        let mut expected = Vec::new();
        whole.update(&data, &mut expected).unwrap();
        whole.finalize(&mut expected).unwrap();

        prop_assert_eq!(out, expected);
    }

    #[test]
    fn gcm_tamper_releases_nothing(
        data in prop::collection::vec(any::<u8>(), 1..512),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let cipher = BlockCipher::new(BlockEngineKind::Aes256, ChainingMode::Gcm, PaddingScheme::None)
            .with_pipeline(pipeline(32));
        let params = block_params(BlockEngineKind::Aes256, ChainingMode::Gcm, PaddingScheme::None, 3);

        let mut ciphertext = cipher.encrypt_bytes(&data, &params).unwrap();
        let index = position.index(ciphertext.len());
        ciphertext[index] ^= 1 << bit;

        let mut plaintext = Vec::new();
        let result = cipher.decrypt(&ciphertext[..], &mut plaintext, &params);
        prop_assert!(matches!(result, Err(Error::AuthenticationFailed)));
        prop_assert!(plaintext.is_empty());
    }
}

#[test]
fn cbc_zero_key_scenario() {
    let cipher = BlockCipher::new(BlockEngineKind::Aes256, ChainingMode::Cbc, PaddingScheme::Pkcs7);
    let params = cipher.parameters().key(&[0u8; 32]).iv(&[0u8; 16]).build().unwrap();

    let ciphertext = cipher.encrypt_bytes(&[0u8; 16], &params).unwrap();
    assert_eq!(ciphertext.len(), 32);
    assert_eq!(hex::encode(&ciphertext[..16]), "dc95c078a2408989ad48a21492842087");
    assert_eq!(cipher.encrypt_bytes(&[0u8; 16], &params).unwrap(), ciphertext);

    let plaintext = cipher.decrypt_bytes(&ciphertext, &params).unwrap();
    assert_eq!(&plaintext[..], &[0u8; 16]);
}

#[test]
fn empty_message_round_trips_in_every_mode() {
    for (mode, padding) in [
        (ChainingMode::Ecb, PaddingScheme::Pkcs7),
        (ChainingMode::Cbc, PaddingScheme::Pkcs7),
        (ChainingMode::Ctr, PaddingScheme::None),
        (ChainingMode::Gcm, PaddingScheme::None),
    ] {
        let cipher = BlockCipher::new(BlockEngineKind::Serpent128, mode, padding);
        let params = block_params(BlockEngineKind::Serpent128, mode, padding, 9);
        let ciphertext = cipher.encrypt_bytes(&[], &params).unwrap();
        assert!(cipher.decrypt_bytes(&ciphertext, &params).unwrap().is_empty(), "{}", mode);
    }
}
