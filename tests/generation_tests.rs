//! End-to-end generation across every target

use wrapgen::{
    generate, generate_from_json, presets, Entity, GeneratorConfig, GeneratorError, IssueKind,
    MemberSummary, Method, NamingOverrides, Parameter, PipelineStage, Property, TargetLanguage,
    TypeModel, TypeRef, ValidationError, Visibility,
};

fn wallet_model() -> TypeModel {
    TypeModel::new(vec![
        Entity::new("PrivateKey", Method::constructor("create"))
            .public()
            .with_named_constructor(
                Method::constructor("withHex")
                    .param("hex", TypeRef::string())
                    .fallible(),
            )
            .with_method(
                Method::new("sign")
                    .param("digest", TypeRef::string())
                    .returning(TypeRef::optional(TypeRef::string())),
            )
            .with_property(Property::new("isValid", TypeRef::bool())),
        Entity::new("Wallet", Method::constructor("create").param("mnemonic", TypeRef::string()))
            .public()
            .with_method(
                Method::static_fn("importJson")
                    .param("json", TypeRef::string())
                    .returning(TypeRef::optional(TypeRef::handle("Wallet"))),
            )
            .with_method(
                Method::new("keyAt")
                    .param("index", TypeRef::int32())
                    .returning(TypeRef::handle("PrivateKey")),
            )
            .with_method(
                Method::new("copyKey")
                    .with_param(Parameter::nullable("passphrase", TypeRef::string()))
                    .returning(TypeRef::handle("PrivateKey")),
            )
            .with_method(Method::new("verify").param("key", TypeRef::handle("PrivateKey")))
            .with_property(Property::new("label", TypeRef::string()).writable())
            .with_property(Property::new("index", TypeRef::int64())),
    ])
    .unwrap()
}

fn contents<'a>(report: &'a wrapgen::GenerationReport, path: &str) -> &'a str {
    &report
        .file(path)
        .unwrap_or_else(|| panic!("missing {path}"))
        .contents
}

#[test]
fn test_cardinality_round_trip_for_every_target() {
    let model = wallet_model();
    let report = generate(&model, GeneratorConfig::default()).unwrap();

    assert_eq!(report.files.len(), model.len() * TargetLanguage::ALL.len());
    for file in &report.files {
        let entity = model.entity(&file.entity).unwrap();
        assert_eq!(file.summary, MemberSummary::expected(entity), "{}", file.path.display());
    }

    let wallet = model.entity("Wallet").unwrap();
    assert_eq!(
        MemberSummary::expected(wallet),
        MemberSummary {
            initializers: 1,
            finalizers: 1,
            functions: 4,
            accessors: 2,
            setters: 1,
        }
    );
}

#[test]
fn test_generation_is_idempotent() {
    let config = presets::trust_wallet();
    let first = generate(&wallet_model(), config.clone()).unwrap();
    let second = generate(&wallet_model(), config).unwrap();

    assert_eq!(first.fingerprint(), second.fingerprint());
    for (a, b) in first.files.iter().zip(&second.files) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.contents, b.contents);
        assert_eq!(a.fingerprint, b.fingerprint);
    }
}

#[test]
fn test_zero_member_entity() {
    let model = TypeModel::new(vec![Entity::new("Empty", Method::constructor("create"))]).unwrap();
    let report = generate(&model, GeneratorConfig::default()).unwrap();
    assert_eq!(report.files.len(), 3);

    let swift = contents(&report, "swift/Empty.swift");
    assert!(swift.contains("    init() {\n        let result = EmptyCreate()\n"));
    assert!(swift.contains("    deinit {\n        EmptyDelete(self.rawValue)\n    }\n}\n"));
    assert!(!swift.contains("func "));

    let kotlin = contents(&report, "kotlin/Empty.kt");
    assert!(kotlin.contains("EmptyDelete(it)"));
    assert!(kotlin.contains("private fun nativeCreate(): COpaquePointer {"));
    assert!(!kotlin.contains("val obj"));

    let cpp = contents(&report, "cpp/Empty.hpp");
    assert!(cpp.contains("&::EmptyDelete"));
    assert!(cpp.contains("    Empty();\n"));
    assert!(cpp.contains("inline Empty::Empty() {\n"));
    assert!(!cpp.contains("class Empty;"));
}

#[test]
fn test_undeclared_handle_aborts_with_validation_error() {
    let document = r#"{
        "entities": [
            {
                "name": "Wallet",
                "constructor": { "name": "create", "is_constructor": true },
                "methods": [
                    { "name": "key", "returns": { "handle": "PrivateKey" } }
                ]
            }
        ]
    }"#;

    let generator = wrapgen::Generator::new(GeneratorConfig::default()).unwrap();
    let err = generator.generate_json(document).unwrap_err();
    assert_eq!(err.stage(), PipelineStage::Validate);
    match err {
        GeneratorError::Validation(ValidationError::UndeclaredEntity {
            entity,
            member,
            referenced,
        }) => {
            assert_eq!(entity, "Wallet");
            assert_eq!(member, "key");
            assert_eq!(referenced, "PrivateKey");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(generate_from_json(document, GeneratorConfig::default()).is_err());
}

#[test]
fn test_consistency_errors_are_aggregated_before_emission() {
    let model = TypeModel::new(vec![
        Entity::new("Wallet", Method::constructor("create"))
            .with_property(Property::new("accounts", TypeRef::collection(TypeRef::int32())))
            .with_method(Method::static_fn("current").returning(TypeRef::handle("Wallet"))),
        Entity::new("Account", Method::constructor("create"))
            .with_method(Method::new("balance").returning(TypeRef::optional(TypeRef::int64()))),
    ])
    .unwrap();

    let err = generate(&model, GeneratorConfig::default()).unwrap_err();
    assert_eq!(err.stage(), PipelineStage::Check);
    let GeneratorError::Consistency(err) = err else {
        panic!("expected a consistency error");
    };

    let triples = err.triples();
    assert_eq!(triples.len(), 9);
    for target in TargetLanguage::ALL {
        assert!(triples.contains(&("Wallet", "accounts", target)));
        assert!(triples.contains(&("Wallet", "current", target)));
        assert!(triples.contains(&("Account", "balance", target)));
    }
    assert!(err
        .issues
        .iter()
        .filter(|issue| issue.member == "current")
        .all(|issue| matches!(issue.kind, IssueKind::Ownership(_))));
}

#[test]
fn test_missing_string_bridge_only_affects_that_target() {
    let mut config = GeneratorConfig::default();
    config.string_bridges.remove("kotlin");

    let err = generate(&wallet_model(), config).unwrap_err();
    let GeneratorError::Consistency(err) = err else {
        panic!("expected a consistency error");
    };
    assert!(err.issues.iter().all(|issue| issue.target == TargetLanguage::Kotlin));
    assert!(err
        .triples()
        .contains(&("PrivateKey", "withHex", TargetLanguage::Kotlin)));
    assert!(!err.triples().iter().any(|(_, member, _)| *member == "isValid"));
}

#[test]
fn test_owned_and_borrowed_handles() {
    let report = generate(&wallet_model(), GeneratorConfig::default()).unwrap();

    let swift = contents(&report, "swift/Wallet.swift");
    assert!(swift.contains("return PrivateKey(rawValue: result, owner: self)"));
    assert!(swift.contains("let result = WalletCopyKey(obj, passphrase)"));
    assert!(swift.contains("return Wallet(rawValue: result)"));
    assert!(swift.contains("WalletVerify(obj, key.rawValue)"));

    let key_swift = contents(&report, "swift/PrivateKey.swift");
    assert!(key_swift.contains("if owner == nil {\n            PrivateKeyDelete(self.rawValue)"));
    assert!(!contents(&report, "swift/Wallet.swift").contains("private let owner"));

    let kotlin = contents(&report, "kotlin/Wallet.kt");
    assert!(kotlin.contains("return PrivateKey.borrowed(result, this)"));
    assert!(kotlin.contains("return PrivateKey(result)"));

    let cpp = contents(&report, "cpp/Wallet.hpp");
    assert!(cpp.contains("return PrivateKey::borrowed(ptr, result);"));
    assert!(cpp.contains("return PrivateKey(result);"));
    assert!(cpp.contains("::WalletVerify(obj, key.rawValue());"));
}

#[test]
fn test_strings_are_released_on_every_target() {
    let report = generate(&wallet_model(), GeneratorConfig::default()).unwrap();

    let swift = contents(&report, "swift/Wallet.swift");
    assert!(swift.contains(
        "        let mnemonic = TWStringCreateWithNSString(mnemonic)\n        defer {\n            TWStringDelete(mnemonic)\n        }\n"
    ));

    let kotlin = contents(&report, "kotlin/Wallet.kt");
    assert!(kotlin.contains("val mnemonicNative = TWStringCreateWithUTF8Bytes(mnemonic)"));
    assert!(kotlin.contains("TWStringDelete(mnemonicNative)"));
    assert!(kotlin.contains("} finally {"));

    let cpp = contents(&report, "cpp/Wallet.hpp");
    assert!(cpp.contains(
        "auto mnemonicNative = std::unique_ptr<TWString, decltype(&TWStringDelete)>(TWStringCreateWithUTF8Bytes(mnemonic.c_str()), &TWStringDelete);"
    ));
    assert!(cpp.contains("auto resultGuard = std::unique_ptr<TWString, decltype(&TWStringDelete)>(result, &TWStringDelete);"));
}

#[test]
fn test_visibility_and_fallible_constructors() {
    let report = generate(&wallet_model(), GeneratorConfig::default()).unwrap();

    let swift = contents(&report, "swift/PrivateKey.swift");
    assert!(swift.contains("public final class PrivateKey {"));
    assert!(swift.contains("public init?(hex: String) {"));

    let kotlin = contents(&report, "kotlin/PrivateKey.kt");
    assert!(!kotlin.contains("internal class"));
    assert!(kotlin.contains("?: throw IllegalArgumentException(\"PrivateKeyCreateWithHex failed\")"));

    let cpp = contents(&report, "cpp/PrivateKey.hpp");
    assert!(cpp.contains("throw std::runtime_error(\"PrivateKeyCreateWithHex failed\");"));

    let model = wallet_model();
    assert_eq!(model.entity("Wallet").unwrap().visibility, Visibility::Public);
}

#[test]
fn test_naming_overrides_reach_every_target() {
    let mut config = GeneratorConfig::default();
    config.naming_overrides = NamingOverrides::new().with("Wallet", "keyAt", "TWHDWalletGetKey");

    let report = generate(&wallet_model(), config).unwrap();
    for target in TargetLanguage::ALL {
        let path = format!("{}/Wallet.{}", target.name(), target.file_extension());
        let text = contents(&report, &path);
        assert!(text.contains("TWHDWalletGetKey("), "{path}");
        assert!(!text.contains("WalletKeyAt("), "{path}");
    }
}

#[test]
fn test_mutually_referencing_entities_emit_self_contained_headers() {
    let document = serde_json::json!({
        "entities": [
            {
                "name": "PrivateKey",
                "constructor": { "name": "create", "is_constructor": true },
                "methods": [
                    { "name": "publicKey", "returns": { "handle": "PublicKey" }, "ownership": "transfer" }
                ]
            },
            {
                "name": "PublicKey",
                "constructor": { "name": "create", "is_constructor": true },
                "methods": [
                    {
                        "name": "matches",
                        "params": [{ "name": "key", "ty": { "handle": "PrivateKey" } }],
                        "returns": { "primitive": "bool" }
                    }
                ]
            }
        ]
    });

    let report = generate_from_json(&document.to_string(), presets::trust_wallet()).unwrap();
    assert_eq!(report.files.len(), 6);

    for (entity, other) in [("PrivateKey", "PublicKey"), ("PublicKey", "PrivateKey")] {
        let cpp = contents(&report, &format!("cpp/{entity}.hpp"));
        let forward = cpp.find(&format!("class {other};")).unwrap();
        let class = cpp.find(&format!("class {entity} {{")).unwrap();
        let class_end = cpp.find("};\n").unwrap();
        let include = cpp.find(&format!("#include \"{other}.hpp\"")).unwrap();
        let definitions = cpp.find(&format!("inline {entity}::{entity}()")).unwrap();
        assert!(forward < class, "{entity}");
        assert!(class_end < include, "{entity}");
        assert!(include < definitions, "{entity}");
        assert_eq!(cpp.matches("namespace TW {").count(), 2, "{entity}");
    }
}

#[test]
fn test_names_taken_by_generated_code_fail_validation() {
    let local = TypeModel::new(vec![Entity::new("Wallet", Method::constructor("create"))
        .with_method(
            Method::new("lookup")
                .param("result", TypeRef::int32())
                .returning(TypeRef::bool()),
        )]);
    assert_eq!(
        local.unwrap_err(),
        ValidationError::ReservedName {
            entity: "Wallet".to_string(),
            member: "lookup".to_string(),
            name: "result".to_string(),
        }
    );

    let member = TypeModel::new(vec![Entity::new("Wallet", Method::constructor("create"))
        .with_property(Property::new("rawValue", TypeRef::int64()))]);
    assert!(matches!(member, Err(ValidationError::ReservedName { .. })));
}

#[test]
fn test_non_null_handles_are_checked_before_wrapping() {
    let report = generate(&wallet_model(), GeneratorConfig::default()).unwrap();

    let cpp = contents(&report, "cpp/Wallet.hpp");
    for native in ["WalletCreate", "WalletKeyAt", "WalletCopyKey", "WalletLabel"] {
        assert!(
            cpp.contains(&format!("throw std::runtime_error(\"{native} returned null\");")),
            "{native}"
        );
    }
    assert!(!cpp.contains("WalletImportJson returned null"));

    let kotlin = contents(&report, "kotlin/Wallet.kt");
    for native in ["WalletCreate", "WalletKeyAt", "WalletCopyKey"] {
        assert!(kotlin.contains(&format!("\"{native} returned null\"")), "{native}");
    }
}

#[test]
fn test_report_written_to_disk() {
    let report = generate(&wallet_model(), presets::trust_wallet()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    for file in &report.files {
        let path = dir.path().join(&file.path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, &file.contents).unwrap();
    }

    for target in TargetLanguage::ALL {
        let written = std::fs::read_dir(dir.path().join(target.name())).unwrap().count();
        assert_eq!(written, 2, "{target}");
    }
    let header = std::fs::read_to_string(dir.path().join("cpp/PrivateKey.hpp")).unwrap();
    assert_eq!(header, contents(&report, "cpp/PrivateKey.hpp"));
}
