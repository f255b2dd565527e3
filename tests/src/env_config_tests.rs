//! Environment-driven configuration. These tests mutate the process
//! environment, so each one runs serially.

use dexbridge_exchanges::lighter::config::{DEFAULT_ACCOUNT_INDEX, DEFAULT_API_KEY_INDEX, MAINNET_BASE_URL, TESTNET_BASE_URL};
use dexbridge_exchanges::lighter::{LighterClient, LighterConfig, TxSigner};
use dexbridge_exchanges::prelude::*;
use dexbridge_tests::{MockSigner, TEST_PRIVATE_KEY};
use serial_test::serial;
use std::env;
use std::rc::Rc;

const VARS: [&str; 4] = [
    "LIGHTER_PRIVATE_KEY",
    "LIGHTER_ACCOUNT_INDEX",
    "LIGHTER_API_KEY_INDEX",
    "LIGHTER_BASE_URL",
];

fn set_env(vars: &[(&str, &str)]) {
    for var in VARS {
        env::remove_var(var);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }
}

fn mock_signer(_: &LighterConfig) -> Result<Rc<dyn TxSigner>> {
    Ok(MockSigner::new())
}

#[test]
#[serial]
fn test_missing_private_key_fails_fast() {
    set_env(&[]);

    assert!(matches!(
        LighterConfig::from_env(),
        Err(ExchangeError::MissingCredentials(_))
    ));
    assert!(matches!(
        LighterClient::from_env(mock_signer),
        Err(ExchangeError::MissingCredentials(_))
    ));
}

#[test]
#[serial]
fn test_defaults() {
    set_env(&[("LIGHTER_PRIVATE_KEY", TEST_PRIVATE_KEY)]);

    let config = LighterConfig::from_env().unwrap();

    assert_eq!(config.account_index, DEFAULT_ACCOUNT_INDEX);
    assert_eq!(config.api_key_index, DEFAULT_API_KEY_INDEX);
    assert_eq!(config.base_url, TESTNET_BASE_URL);
    assert!(config.testnet);
    assert!(config.require_private_key().is_ok());
}

#[test]
#[serial]
fn test_overrides_and_mainnet() {
    set_env(&[
        ("LIGHTER_PRIVATE_KEY", TEST_PRIVATE_KEY),
        ("LIGHTER_ACCOUNT_INDEX", "281474976710654"),
        ("LIGHTER_API_KEY_INDEX", "4"),
        ("LIGHTER_BASE_URL", MAINNET_BASE_URL),
    ]);

    let client = LighterClient::from_env(mock_signer).unwrap();
    let config = client.config();

    assert_eq!(config.account_index, 281474976710654);
    assert_eq!(config.api_key_index, 4);
    assert!(!config.testnet);
    assert_eq!(config.ws_url, "wss://mainnet.zklighter.elliot.ai/stream");
}

#[test]
#[serial]
fn test_signer_factory_sees_config() {
    set_env(&[
        ("LIGHTER_PRIVATE_KEY", TEST_PRIVATE_KEY),
        ("LIGHTER_API_KEY_INDEX", "9"),
    ]);

    let result = LighterClient::from_env(|config| {
        assert_eq!(config.api_key_index, 9);
        Err(ExchangeError::SigningError("no signer for tests".to_string()))
    });

    assert!(matches!(result, Err(ExchangeError::SigningError(_))));
}

#[test]
#[serial]
fn test_invalid_values_rejected() {
    set_env(&[
        ("LIGHTER_PRIVATE_KEY", TEST_PRIVATE_KEY),
        ("LIGHTER_API_KEY_INDEX", "300"),
    ]);
    assert!(matches!(
        LighterConfig::from_env(),
        Err(ExchangeError::ConfigurationError(_))
    ));

    set_env(&[("LIGHTER_PRIVATE_KEY", "zz-not-hex")]);
    assert!(matches!(
        LighterConfig::from_env(),
        Err(ExchangeError::InvalidCredentials(_))
    ));

    set_env(&[
        ("LIGHTER_PRIVATE_KEY", TEST_PRIVATE_KEY),
        ("LIGHTER_BASE_URL", "not a url"),
    ]);
    assert!(matches!(LighterConfig::from_env(), Err(ExchangeError::InvalidUrl(_))));
}
