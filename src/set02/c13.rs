// ECB cut-and-paste

use std::{collections::HashMap, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::debug;

use crate::{
    aes::AES_BLOCK_SIZE, decrypt_aes_128_ecb, discover_block_size, encrypt_aes_128_ecb,
    error::AttackError, pkcs7_pad, EncryptionOracle, MAX_PROBE_LEN,
};

const DEFAULT_UID: u64 = 10;
const DEFAULT_ROLE: &str = "user";

// The parts of an encoded profile an attacker can predict.
const EMAIL_FIELD: &str = "email=";
const FIELDS_BEFORE_ROLE: &str = "email=&uid=10&role=";

const RESERVED_CHARS: [char; 2] = ['&', '='];

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum ProfileError {
    #[error("malformed key-value pair '{0}'")]
    MalformedPair(String),

    #[error("cannot parse uid '{0}' as an integer")]
    InvalidUid(String),

    #[error("{0} not parsed from query")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    email: String,
    uid: u64,
    role: String,
}

impl UserProfile {
    pub fn new(email: &str, uid: u64, role: &str) -> Self {
        UserProfile {
            email: email.to_string(),
            uid,
            role: role.to_string(),
        }
    }

    pub fn profile_for(email: &str) -> Self {
        Self::new(email, DEFAULT_UID, DEFAULT_ROLE)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl Display for UserProfile {
    /// Encode as `email=...&uid=...&role=...`, stripping the metacharacters
    /// `&` and `=` from the free-text fields.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "email={}&uid={}&role={}",
            sanitize(&self.email),
            self.uid,
            sanitize(&self.role)
        )
    }
}

impl FromStr for UserProfile {
    type Err = ProfileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parsed = parse_query(value)?;
        let mut take = |field: &'static str| {
            parsed
                .remove(field)
                .ok_or(ProfileError::MissingField(field))
        };
        let email = take("email")?;
        let uid = take("uid")?;
        let role = take("role")?;
        Ok(Self {
            email,
            uid: uid.parse::<u64>().map_err(|_| ProfileError::InvalidUid(uid))?,
            role,
        })
    }
}

/// Hands out encrypted profiles for any email, under a key it keeps secret.
pub struct ProfileOracle {
    key: [u8; AES_BLOCK_SIZE],
}

impl ProfileOracle {
    pub fn new(key: [u8; AES_BLOCK_SIZE]) -> Self {
        Self { key }
    }

    pub fn encrypt_profile(&self, email: &str) -> Vec<u8> {
        let profile = UserProfile::profile_for(email);
        encrypt_aes_128_ecb(profile.to_string().as_bytes(), &self.key)
    }

    /// Decrypt, unpad and parse a profile, as the victim application would.
    pub fn decrypt_profile(&self, ciphertext: &[u8]) -> Result<UserProfile, ProfileError> {
        let encoded = decrypt_aes_128_ecb(ciphertext, &self.key);
        String::from_utf8_lossy(&encoded).parse()
    }
}

impl EncryptionOracle for ProfileOracle {
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8> {
        self.encrypt_profile(&String::from_utf8_lossy(prefix))
    }
}

/// Forge a ciphertext that decrypts to a profile with the given `role`.
///
/// Two encryptions are spliced together:
///  1. `email=AAA...&uid=10&role=` ending exactly on a block boundary, so the
///     role field starts a fresh block that we throw away.
///  2. `email=AAA...` ending on a block boundary followed by `role` with its
///     own PKCS#7 padding, giving us one block that decrypts to the role.
///
/// ECB encrypts each block independently, so the blocks of (1) followed by
/// the role block of (2) decrypt as if they were encrypted together.
///
/// The role may not contain `&` or `=`: the oracle strips them, which would
/// push the role off its block boundary.
pub fn forge_role_profile<O>(oracle: &O, role: &str) -> Result<Vec<u8>, AttackError>
where
    O: EncryptionOracle + ?Sized,
{
    if role.contains(RESERVED_CHARS) {
        return Err(AttackError::ReservedCharacter {
            value: role.to_string(),
        });
    }
    let block_size = discover_block_size(oracle, MAX_PROBE_LEN)?;
    let too_long = AttackError::ValueTooLong {
        len: role.len(),
        block_size,
    };
    let pad_block_size = u8::try_from(block_size).map_err(|_| too_long.clone())?;
    if role.len() >= block_size {
        return Err(too_long);
    }

    // (1) Everything up to and including 'role=', block aligned.
    let head_filler_len = filler_len(FIELDS_BEFORE_ROLE.len(), block_size);
    let head_len = FIELDS_BEFORE_ROLE.len() + head_filler_len;
    let head = oracle.encrypt(&vec![b'A'; head_filler_len]);

    // (2) The padded role, alone in its own block.
    let role_filler_len = filler_len(EMAIL_FIELD.len(), block_size);
    let role_block_start = EMAIL_FIELD.len() + role_filler_len;
    let role_input = [
        vec![b'A'; role_filler_len],
        pkcs7_pad(role.as_bytes(), pad_block_size),
    ]
    .concat();
    let role_ciphertext = oracle.encrypt(&role_input);

    debug!(block_size, head_len, role_block_start, "splicing forged profile");
    let head_blocks = leading_bytes(&head, head_len)?;
    let role_block = leading_bytes(&role_ciphertext, role_block_start + block_size)?;
    Ok([head_blocks, &role_block[role_block_start..]].concat())
}

fn leading_bytes(ciphertext: &[u8], len: usize) -> Result<&[u8], AttackError> {
    ciphertext
        .get(..len)
        .ok_or(AttackError::UnexpectedLayout {
            expected: len,
            len: ciphertext.len(),
        })
}

/// Forge a ciphertext that decrypts to an admin profile.
pub fn forge_admin_profile<O>(oracle: &O) -> Result<Vec<u8>, AttackError>
where
    O: EncryptionOracle + ?Sized,
{
    forge_role_profile(oracle, "admin")
}

/// The number of filler bytes that take `len` bytes up to a block boundary.
fn filler_len(len: usize, block_size: usize) -> usize {
    (block_size - len % block_size) % block_size
}

fn sanitize(value: &str) -> String {
    value.replace(RESERVED_CHARS, "")
}

fn parse_query(query: &str) -> Result<HashMap<String, String>, ProfileError> {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if !v.contains('=') => Ok((k.to_string(), v.to_string())),
            _ => Err(ProfileError::MalformedPair(pair.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use rstest::rstest;

    use crate::random_bytes;

    #[test]
    fn ecb_cut_and_paste_attack() {
        // Lets create our oracle, with some fixed random key.
        let oracle = ProfileOracle::new(random_bytes::<AES_BLOCK_SIZE>());

        let forged_profile = forge_admin_profile(&oracle).unwrap();

        let decrypted = oracle.decrypt_profile(&forged_profile).unwrap();
        assert_eq!(decrypted.role(), "admin");
        assert_eq!(decrypted.uid(), 10);
        assert_eq!(decrypted.email(), "AAAAAAAAAAAAA");
    }

    #[rstest]
    #[case("root")]
    #[case("superuser")]
    #[case("x")]
    fn forge_role_profile_forges_any_short_role(#[case] role: &str) {
        let oracle = ProfileOracle::new(*b"YELLOW SUBMARINE");

        let forged_profile = forge_role_profile(&oracle, role).unwrap();

        assert_eq!(forged_profile.len() % AES_BLOCK_SIZE, 0);
        assert_eq!(oracle.decrypt_profile(&forged_profile).unwrap().role(), role);
    }

    #[test]
    fn forge_role_profile_rejects_role_longer_than_a_block() {
        let oracle = ProfileOracle::new(*b"YELLOW SUBMARINE");

        let result = forge_role_profile(&oracle, "administrator123");

        assert_eq!(
            result,
            Err(AttackError::ValueTooLong {
                len: 16,
                block_size: 16
            })
        );
    }

    #[rstest]
    #[case("a=b")]
    #[case("admin&uid=0")]
    #[case("=")]
    fn forge_role_profile_rejects_reserved_characters_without_querying(#[case] role: &str) {
        let calls = AtomicUsize::new(0);
        let oracle = |prefix: &[u8]| {
            calls.fetch_add(1, Ordering::Relaxed);
            ProfileOracle::new(*b"YELLOW SUBMARINE").encrypt(prefix)
        };

        let result = forge_role_profile(&oracle, role);

        assert_eq!(
            result,
            Err(AttackError::ReservedCharacter {
                value: role.to_string()
            })
        );
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn forge_role_profile_returns_err_given_oracle_with_other_layout() {
        let key = *b"YELLOW SUBMARINE";
        // Not a profile: no 'email=' field and no trailing fields.
        let oracle =
            |prefix: &[u8]| encrypt_aes_128_ecb(&[b"x=".as_slice(), prefix].concat(), &key);

        let result = forge_role_profile(&oracle, "admin");

        assert_eq!(
            result,
            Err(AttackError::UnexpectedLayout {
                expected: 32,
                len: 16
            })
        );
    }

    #[test]
    fn profile_oracle_block_size_is_discoverable_from_empty_email() {
        let oracle = ProfileOracle::new(*b"YELLOW SUBMARINE");

        assert_eq!(discover_block_size(&oracle, MAX_PROBE_LEN), Ok(16));
        assert_eq!(crate::discover_block_count(&oracle, 16), 2);
    }

    #[rstest]
    #[case(
        UserProfile::new("foo@bar.com", 10, "user"),
        "email=foo@bar.com&uid=10&role=user"
    )]
    #[case(
        UserProfile::new("foo@bar.com&role=admin", 10, "user"),
        "email=foo@bar.comroleadmin&uid=10&role=user"
    )]
    fn user_profile_encodes_without_metacharacters(
        #[case] profile: UserProfile,
        #[case] expected: &str,
    ) {
        assert_eq!(profile.to_string(), expected);
    }

    #[rstest]
    #[case("email=foo@bar.com&uid=10&role=user", UserProfile::new("foo@bar.com", 10, "user"))]
    #[case("email=quu@fux.floo&uid=0&role=admin", UserProfile::new("quu@fux.floo", 0, "admin"))]
    #[case("role=admin&email=a@b.c&uid=7", UserProfile::new("a@b.c", 7, "admin"))]
    fn user_profile_parses_query(#[case] query: &str, #[case] expected: UserProfile) {
        assert_eq!(query.parse::<UserProfile>(), Ok(expected));
    }

    #[rstest]
    #[case("email=a@b.c&uid=10", ProfileError::MissingField("role"))]
    #[case("email=a@b.c&uid=ten&role=user", ProfileError::InvalidUid("ten".to_string()))]
    #[case("email=a@b.c&uid&role=user", ProfileError::MalformedPair("uid".to_string()))]
    #[case("email=a=b&uid=10&role=user", ProfileError::MalformedPair("email=a=b".to_string()))]
    fn user_profile_rejects_malformed_query(#[case] query: &str, #[case] expected: ProfileError) {
        assert_eq!(query.parse::<UserProfile>(), Err(expected));
    }

    #[test]
    fn parse_query_parses_query_arguments() {
        let query = "foo=bar&baz=qux&zap=zazzle";

        let parsed = parse_query(query).unwrap();

        let mut expected = HashMap::new();
        expected.insert("foo".to_string(), "bar".to_string());
        expected.insert("baz".to_string(), "qux".to_string());
        expected.insert("zap".to_string(), "zazzle".to_string());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn encrypt_and_decrypt_user_profile() {
        let oracle = ProfileOracle::new(random_bytes::<16>());

        let ciphertext = oracle.encrypt_profile("test@yahoo.com");
        let decrypted = oracle.decrypt_profile(&ciphertext).unwrap();

        assert_eq!(decrypted, UserProfile::profile_for("test@yahoo.com"));
    }
}
