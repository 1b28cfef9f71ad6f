//! Kotlin/Native backend
//!
//! Wrappers hold a `COpaquePointer` and register a cleaner that calls the
//! native destructor once the wrapper is collected. Declared constructors are
//! secondary constructors delegating to a private companion helper, so a
//! failing native call throws before any handle is adopted. Borrowed views are
//! created through `borrowed(rawValue, owner)` and never register a cleaner.

use std::slice;

use wrapgen_checker::{Marshalling, MemberSummary, Ownership, StringBridge, TargetLanguage};
use wrapgen_model::{capitalize, Entity, Visibility};

use crate::backend::{EmitContext, EmitError, Emitter, SourceText};
use crate::ir::{
    IRBuilder, IRFunction, IRInitializer, IRParameter, IRProperty, IRReturn, IRSetter, IRWrapper,
};
use crate::utils::{render_banner, sanitize_identifier, CodeWriter};

const TARGET: TargetLanguage = TargetLanguage::Kotlin;

#[derive(Debug, Clone)]
pub struct KotlinEmitter {
    package: Option<String>,
    native_package: Option<String>,
    opt_in: bool,
}

impl Default for KotlinEmitter {
    fn default() -> Self {
        Self {
            package: None,
            native_package: None,
            opt_in: true,
        }
    }
}

impl KotlinEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Package of the cinterop bindings for the native library
    pub fn with_native_package(mut self, package: impl Into<String>) -> Self {
        self.native_package = Some(package.into());
        self
    }

    pub fn with_opt_in(mut self, opt_in: bool) -> Self {
        self.opt_in = opt_in;
        self
    }
}

impl Emitter for KotlinEmitter {
    fn target(&self) -> TargetLanguage {
        TARGET
    }

    fn emit(&self, entity: &Entity, ctx: &EmitContext<'_>) -> Result<SourceText, EmitError> {
        let ir = IRBuilder::new(TARGET, ctx).build(entity)?;
        let mut renderer = KotlinRenderer::new(&ir, ctx.bridge);
        renderer.w.raw(&render_banner(ctx.banner, &ir.name, TARGET));
        renderer.render_header(self)?;
        renderer.render_class()?;
        tracing::trace!(entity = %ir.name, "rendered kotlin wrapper");
        Ok(renderer.finish())
    }
}

struct KotlinRenderer<'a> {
    ir: &'a IRWrapper,
    bridge: Option<&'a StringBridge>,
    w: CodeWriter,
    summary: MemberSummary,
}

impl<'a> KotlinRenderer<'a> {
    fn new(ir: &'a IRWrapper, bridge: Option<&'a StringBridge>) -> Self {
        Self {
            ir,
            bridge,
            w: CodeWriter::new("    "),
            summary: MemberSummary::default(),
        }
    }

    fn finish(self) -> SourceText {
        SourceText {
            text: self.w.finish(),
            summary: self.summary,
        }
    }

    fn bridge(&self) -> Result<&'a StringBridge, EmitError> {
        self.bridge.ok_or(EmitError::MissingBridge { target: TARGET })
    }

    fn render_header(&mut self, emitter: &KotlinEmitter) -> Result<(), EmitError> {
        if let Some(package) = &emitter.package {
            self.w.line(format_args!("package {package}"))?;
            self.w.blank()?;
        }

        let mut imports = vec![
            "kotlin.native.ref.createCleaner".to_string(),
            "kotlinx.cinterop.COpaquePointer".to_string(),
        ];
        if emitter.opt_in {
            imports.push("kotlinx.cinterop.ExperimentalForeignApi".to_string());
        }
        if self.returns_strings() {
            imports.push("kotlinx.cinterop.toKString".to_string());
        }
        if let Some(native) = &emitter.native_package {
            imports.push(format!("{native}.*"));
        }
        imports.sort();
        for import in imports {
            self.w.line(format_args!("import {import}"))?;
        }
        self.w.blank()?;

        if emitter.opt_in {
            self.w.line(
                "@OptIn(ExperimentalForeignApi::class, kotlin.experimental.ExperimentalNativeApi::class)",
            )?;
        }
        Ok(())
    }

    fn returns_strings(&self) -> bool {
        self.ir
            .functions
            .iter()
            .map(|f| &f.returns)
            .chain(self.ir.properties.iter().map(|p| &p.returns))
            .any(IRReturn::is_bridged)
    }

    fn render_class(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        let access = match ir.visibility {
            Visibility::Public => "",
            Visibility::Internal => "internal ",
        };

        if ir.retains_owner {
            self.w.open(format_args!(
                "{access}class {} private constructor(val rawValue: COpaquePointer, private val owner: Any?) {{",
                ir.name
            ))?;
            self.w.line(format_args!(
                "private val cleaner = if (owner == null) createCleaner(rawValue) {{ {}(it) }} else null",
                ir.destructor
            ))?;
            self.w.blank()?;
            self.w
                .line("constructor(rawValue: COpaquePointer) : this(rawValue, null)")?;
        } else {
            self.w.open(format_args!(
                "{access}class {}(val rawValue: COpaquePointer) {{",
                ir.name
            ))?;
            self.w.line(format_args!(
                "private val cleaner = createCleaner(rawValue) {{ {}(it) }}",
                ir.destructor
            ))?;
        }
        self.summary.finalizers += 1;

        for initializer in &ir.initializers {
            self.w.blank()?;
            self.w.line(format_args!(
                "constructor({}) : this({}({}))",
                declarations(&initializer.parameters),
                helper_name(initializer),
                initializer
                    .parameters
                    .iter()
                    .map(|p| sanitize_identifier(&p.name, TARGET))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))?;
            self.summary.initializers += 1;
        }

        for function in ir.functions.iter().filter(|f| !f.is_static) {
            self.w.blank()?;
            self.render_function(function)?;
        }
        for property in &ir.properties {
            self.w.blank()?;
            self.render_property(property)?;
        }

        self.w.blank()?;
        self.render_companion()?;
        self.w.close("}")?;
        Ok(())
    }

    fn render_companion(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        self.w.open("companion object {")?;

        let mut first = true;
        for function in ir.functions.iter().filter(|f| f.is_static) {
            if !first {
                self.w.blank()?;
            }
            self.render_function(function)?;
            first = false;
        }

        if ir.retains_owner {
            if !first {
                self.w.blank()?;
            }
            self.w.line(format_args!(
                "internal fun borrowed(rawValue: COpaquePointer, owner: Any): {0} = {0}(rawValue, owner)",
                ir.name
            ))?;
            first = false;
        }

        for initializer in &ir.initializers {
            if !first {
                self.w.blank()?;
            }
            self.render_constructor_helper(initializer)?;
            first = false;
        }

        self.w.close("}")?;
        Ok(())
    }

    /// Native construction for one declared constructor; throws instead of
    /// returning a null handle
    fn render_constructor_helper(&mut self, initializer: &IRInitializer) -> Result<(), EmitError> {
        self.w.open(format_args!(
            "private fun {}({}): COpaquePointer {{",
            helper_name(initializer),
            declarations(&initializer.parameters)
        ))?;

        let call = format!(
            "{}({})",
            initializer.native,
            arguments(None, &initializer.parameters)
        );
        let bridged = self.open_bridging(&initializer.parameters)?;
        if initializer.fallible {
            self.w.line(format_args!(
                "return {call} ?: throw IllegalArgumentException(\"{} failed\")",
                initializer.native
            ))?;
        } else {
            self.w.line(format_args!(
                "return checkNotNull({call}) {{ \"{} returned null\" }}",
                initializer.native
            ))?;
        }
        self.close_bridging(&bridged)?;

        self.w.close("}")?;
        Ok(())
    }

    fn render_function(&mut self, function: &IRFunction) -> Result<(), EmitError> {
        let returns = if function.returns.is_void() {
            String::new()
        } else {
            format!(": {}", function.returns.ty.host)
        };
        self.w.open(format_args!(
            "fun {}({}){returns} {{",
            sanitize_identifier(&function.name, TARGET),
            declarations(&function.parameters)
        ))?;

        let receiver = if function.is_static {
            None
        } else {
            self.w.line("val obj = rawValue")?;
            Some("obj")
        };
        let bridged = self.open_bridging(&function.parameters)?;
        let call = format!(
            "{}({})",
            function.native,
            arguments(receiver, &function.parameters)
        );
        self.render_result(&call, &function.native, &function.returns)?;
        self.close_bridging(&bridged)?;
        self.w.close("}")?;

        self.summary.functions += 1;
        Ok(())
    }

    fn render_property(&mut self, property: &IRProperty) -> Result<(), EmitError> {
        let keyword = if property.setter.is_some() { "var" } else { "val" };
        self.w.open(format_args!(
            "{keyword} {}: {}",
            sanitize_identifier(&property.name, TARGET),
            property.returns.ty.host
        ))?;

        self.w.open("get() {")?;
        self.w.line("val obj = rawValue")?;
        self.render_result(
            &format!("{}(obj)", property.getter),
            &property.getter,
            &property.returns,
        )?;
        self.w.close("}")?;
        self.summary.accessors += 1;

        if let Some(setter) = &property.setter {
            self.w.open("set(value) {")?;
            self.render_setter(setter)?;
            self.w.close("}")?;
            self.summary.setters += 1;
        }

        self.w.dedent();
        Ok(())
    }

    fn render_setter(&mut self, setter: &IRSetter) -> Result<(), EmitError> {
        let value = IRParameter {
            name: "value".to_string(),
            ty: setter.ty.clone(),
        };
        self.w.line("val obj = rawValue")?;
        let bridged = self.open_bridging(slice::from_ref(&value))?;
        self.w.line(format_args!(
            "{}({})",
            setter.native,
            arguments(Some("obj"), slice::from_ref(&value))
        ))?;
        self.close_bridging(&bridged)
    }

    /// Acquire a native string per string parameter, each guarded by its own
    /// `try`. Returns the release calls for [`Self::close_bridging`].
    fn open_bridging(&mut self, parameters: &[IRParameter]) -> Result<Vec<String>, EmitError> {
        let mut releases = Vec::new();
        for param in parameters.iter().filter(|p| p.is_bridged()) {
            let bridge = self.bridge()?;
            let name = sanitize_identifier(&param.name, TARGET);
            let local = native_local(&param.name);
            if param.ty.nullable {
                self.w.line(format_args!(
                    "val {local} = {name}?.let {{ {}(it) }}",
                    bridge.create
                ))?;
                releases.push(format!("{local}?.let {{ {}(it) }}", bridge.release));
            } else {
                self.w
                    .line(format_args!("val {local} = {}({name})", bridge.create))?;
                releases.push(format!("{}({local})", bridge.release));
            }
            self.w.open("try {")?;
        }
        Ok(releases)
    }

    fn close_bridging(&mut self, releases: &[String]) -> Result<(), EmitError> {
        for release in releases.iter().rev() {
            self.w.close("} finally {")?;
            self.w.indent();
            self.w.line(release)?;
            self.w.close("}")?;
        }
        Ok(())
    }

    fn render_result(
        &mut self,
        call: &str,
        native: &str,
        returns: &IRReturn,
    ) -> Result<(), EmitError> {
        if returns.is_void() {
            self.w.line(call)?;
            return Ok(());
        }

        let pointer = matches!(
            returns.ty.marshalling,
            Marshalling::StringBridge | Marshalling::HandleWrap
        );
        if returns.ty.nullable {
            self.w.line(format_args!("val result = {call} ?: return null"))?;
        } else if pointer {
            self.w.line(format_args!(
                "val result = checkNotNull({call}) {{ \"{native} returned null\" }}"
            ))?;
        } else {
            self.w.line(format_args!("val result = {call}"))?;
        }

        match returns.ty.marshalling {
            Marshalling::StringBridge => {
                let bridge = self.bridge()?;
                self.w.open("try {")?;
                self.w.line(format_args!(
                    "return {}(result)?.toKString().orEmpty()",
                    bridge.to_host
                ))?;
                self.w.close("} finally {")?;
                self.w.indent();
                self.w.line(format_args!("{}(result)", bridge.release))?;
                self.w.close("}")?;
            }
            Marshalling::HandleWrap => {
                let entity = returns.entity().unwrap_or(&returns.ty.host);
                match returns.ownership {
                    Ownership::Borrowed => self
                        .w
                        .line(format_args!("return {entity}.borrowed(result, this)"))?,
                    Ownership::Owned | Ownership::NotApplicable => {
                        self.w.line(format_args!("return {entity}(result)"))?
                    }
                }
            }
            Marshalling::PassThrough | Marshalling::HandleUnwrap => {
                self.w.line("return result")?;
            }
        }
        Ok(())
    }
}

fn helper_name(initializer: &IRInitializer) -> String {
    format!("native{}", capitalize(&initializer.name))
}

fn native_local(name: &str) -> String {
    format!("{name}Native")
}

fn declarations(parameters: &[IRParameter]) -> String {
    parameters
        .iter()
        .map(|p| format!("{}: {}", sanitize_identifier(&p.name, TARGET), p.ty.host))
        .collect::<Vec<_>>()
        .join(", ")
}

fn arguments(receiver: Option<&str>, parameters: &[IRParameter]) -> String {
    receiver
        .map(str::to_string)
        .into_iter()
        .chain(parameters.iter().map(|p| {
            let name = sanitize_identifier(&p.name, TARGET);
            match (p.ty.marshalling, p.ty.nullable) {
                (Marshalling::StringBridge, _) => native_local(&p.name),
                (Marshalling::HandleUnwrap, true) => format!("{name}?.rawValue"),
                (Marshalling::HandleUnwrap, false) => format!("{name}.rawValue"),
                _ => name,
            }
        }))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets;
    use wrapgen_checker::OwnershipTable;
    use wrapgen_model::{Method, NamingOverrides, Parameter, Property, TypeModel, TypeRef};

    fn emit_with(emitter: &KotlinEmitter, model: &TypeModel, entity: &str) -> SourceText {
        let ownership = OwnershipTable::build(model).unwrap();
        let overrides = NamingOverrides::new();
        let bridge = presets::utf8_tw_string();
        let ctx = EmitContext {
            banner: "",
            bridge: Some(&bridge),
            overrides: &overrides,
            ownership: &ownership,
        };
        emitter.emit(model.entity(entity).unwrap(), &ctx).unwrap()
    }

    fn emit(model: &TypeModel, entity: &str) -> SourceText {
        emit_with(&KotlinEmitter::new(), model, entity)
    }

    fn first_struct() -> TypeModel {
        TypeModel::new(vec![Entity::new(
            "FirstStruct",
            Method::constructor("create").param("string", TypeRef::string()),
        )
        .with_method(
            Method::static_fn("firstFunction")
                .param("first_param", TypeRef::int32())
                .returning(TypeRef::bool()),
        )
        .with_property(Property::new("firstProperty", TypeRef::bool()))])
        .unwrap()
    }

    #[test]
    fn test_first_struct() {
        let source = emit(&first_struct(), "FirstStruct");
        assert_eq!(
            source.text,
            r#"// This is a GENERATED FILE, changes made here WILL BE LOST.
//

import kotlin.native.ref.createCleaner
import kotlinx.cinterop.COpaquePointer
import kotlinx.cinterop.ExperimentalForeignApi

@OptIn(ExperimentalForeignApi::class, kotlin.experimental.ExperimentalNativeApi::class)
internal class FirstStruct(val rawValue: COpaquePointer) {
    private val cleaner = createCleaner(rawValue) { FirstStructDelete(it) }

    constructor(string: String) : this(nativeCreate(string))

    val firstProperty: Boolean
        get() {
            val obj = rawValue
            val result = FirstStructFirstProperty(obj)
            return result
        }

    companion object {
        fun firstFunction(first_param: Int): Boolean {
            val result = FirstStructFirstFunction(first_param)
            return result
        }

        private fun nativeCreate(string: String): COpaquePointer {
            val stringNative = TWStringCreateWithUTF8Bytes(string)
            try {
                return checkNotNull(FirstStructCreate(stringNative)) { "FirstStructCreate returned null" }
            } finally {
                TWStringDelete(stringNative)
            }
        }
    }
}
"#
        );
        assert_eq!(
            source.summary,
            MemberSummary {
                initializers: 1,
                finalizers: 1,
                functions: 1,
                accessors: 1,
                setters: 0,
            }
        );
    }

    #[test]
    fn test_package_and_opt_in_options() {
        let emitter = KotlinEmitter::new()
            .with_package("com.example.core")
            .with_native_package("com.example.native")
            .with_opt_in(false);
        let source = emit_with(&emitter, &first_struct(), "FirstStruct");
        assert!(source.text.contains(
            "package com.example.core\n\nimport com.example.native.*\nimport kotlin.native.ref.createCleaner\n"
        ));
        assert!(!source.text.contains("@OptIn"));
    }

    #[test]
    fn test_borrowed_views_skip_the_cleaner() {
        let model = TypeModel::new(vec![
            Entity::new("Key", Method::constructor("create")),
            Entity::new("Wallet", Method::constructor("create"))
                .public()
                .with_property(Property::new("key", TypeRef::handle("Key"))),
        ])
        .unwrap();

        let key = emit(&model, "Key");
        assert!(key.text.contains(
            "internal class Key private constructor(val rawValue: COpaquePointer, private val owner: Any?) {
    private val cleaner = if (owner == null) createCleaner(rawValue) { KeyDelete(it) } else null

    constructor(rawValue: COpaquePointer) : this(rawValue, null)

    constructor() : this(nativeCreate())"
        ));
        assert!(key.text.contains(
            "        internal fun borrowed(rawValue: COpaquePointer, owner: Any): Key = Key(rawValue, owner)"
        ));

        let wallet = emit(&model, "Wallet");
        assert!(wallet.text.contains("\nclass Wallet(val rawValue: COpaquePointer) {"));
        assert!(wallet.text.contains(
            "    val key: Key
        get() {
            val obj = rawValue
            val result = checkNotNull(WalletKey(obj)) { \"WalletKey returned null\" }
            return Key.borrowed(result, this)
        }"
        ));
    }

    #[test]
    fn test_strings_are_released_in_finally() {
        let model = TypeModel::new(vec![Entity::new("Wallet", Method::constructor("create"))
            .with_method(
                Method::new("sign")
                    .param("message", TypeRef::string())
                    .with_param(Parameter::nullable("memo", TypeRef::string()))
                    .returning(TypeRef::optional(TypeRef::string())),
            )])
        .unwrap();
        let source = emit(&model, "Wallet");
        assert!(source.text.contains("import kotlinx.cinterop.toKString\n"));
        assert!(source.text.contains(
            "    fun sign(message: String, memo: String?): String? {
        val obj = rawValue
        val messageNative = TWStringCreateWithUTF8Bytes(message)
        try {
            val memoNative = memo?.let { TWStringCreateWithUTF8Bytes(it) }
            try {
                val result = WalletSign(obj, messageNative, memoNative) ?: return null
                try {
                    return TWStringUTF8Bytes(result)?.toKString().orEmpty()
                } finally {
                    TWStringDelete(result)
                }
            } finally {
                memoNative?.let { TWStringDelete(it) }
            }
        } finally {
            TWStringDelete(messageNative)
        }
    }"
        ));
    }

    #[test]
    fn test_fallible_constructor_throws_before_adoption() {
        let model = TypeModel::new(vec![Entity::new(
            "Key",
            Method::constructor("create").param("hex", TypeRef::string()).fallible(),
        )])
        .unwrap();
        let source = emit(&model, "Key");
        assert!(source.text.contains(
            "return KeyCreate(hexNative) ?: throw IllegalArgumentException(\"KeyCreate failed\")"
        ));
    }

    #[test]
    fn test_writable_property() {
        let model = TypeModel::new(vec![Entity::new("Wallet", Method::constructor("create"))
            .with_property(Property::new("label", TypeRef::string()).writable())])
        .unwrap();
        let source = emit(&model, "Wallet");
        assert!(source.text.contains(
            "        set(value) {
            val obj = rawValue
            val valueNative = TWStringCreateWithUTF8Bytes(value)
            try {
                WalletSetLabel(obj, valueNative)
            } finally {
                TWStringDelete(valueNative)
            }
        }"
        ));
        assert!(source.text.contains("    var label: String\n"));
        assert_eq!(source.summary.setters, 1);
    }
}
