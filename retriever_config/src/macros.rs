/// Macro to create a configuration value group struct.
///
/// Usage:
/// ```ignore
/// use retriever_config::config_group;
///
/// config_group!({
///     ref TEST_INT: usize = 42;
///     ref TEST_STRING: String = "default".to_string();
/// });
/// ```
///
/// This creates a `ConfigValueGroup` struct with the specified fields, a `Default` impl holding the declared
/// defaults, and an `apply_env_overrides` method that loads values from environment variables named after the
/// group's module.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        #[allow(unused_imports)]
        use $crate::ParsableConfigValue;

        /// ConfigValueGroup struct containing all configurable values
        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                #[allow(non_snake_case)]
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            /// Default values only, no environment variable overrides.
            fn default() -> Self {
                Self {
                    $(
                        $name: {
                            let v: $type = $value;
                            v
                        },
                    )+
                }
            }
        }

        impl AsRef<ConfigValueGroup> for ConfigValueGroup {
            fn as_ref(&self) -> &ConfigValueGroup {
                self
            }
        }

        impl ConfigValueGroup {
            pub fn new() -> Self {
                Self::default()
            }

            /// Names of the environment variables read by `apply_env_overrides`, in declaration order.
            pub fn env_var_names() -> &'static [&'static str] {
                const NAMES: &[&str] = &[
                    $(
                        const_str::concat!(
                            "IPFS_RETRIEVER_",
                            const_str::convert_ascii_case!(upper, konst::string::rsplit_once(module_path!(), "::").unwrap().1),
                            "_",
                            const_str::convert_ascii_case!(upper, stringify!($name))),
                    )+
                ];
                NAMES
            }

            /// Apply environment variable overrides to this configuration group.
            ///
            /// The group name is derived from the module path. For example, in module
            /// `retriever_config::groups::client`, the env var for MAX_RETRIES is IPFS_RETRIEVER_CLIENT_MAX_RETRIES.
            /// Unset variables fall back to their aliases, then to the value already held.
            pub fn apply_env_overrides(&mut self) {
                $(
                    {
                        const ENV_VAR_NAME: &str = const_str::concat!(
                            "IPFS_RETRIEVER_",
                            const_str::convert_ascii_case!(upper, konst::string::rsplit_once(module_path!(), "::").unwrap().1),
                            "_",
                            const_str::convert_ascii_case!(upper, stringify!($name)));

                        let mut maybe_env_value = std::env::var(ENV_VAR_NAME).ok();

                        if maybe_env_value.is_none() {
                            for &(primary_name, alias_name) in $crate::ENVIRONMENT_NAME_ALIASES {
                                if primary_name == ENV_VAR_NAME {
                                    let alt_env_value = std::env::var(alias_name).ok();
                                    if alt_env_value.is_some() {
                                        maybe_env_value = alt_env_value;
                                        break;
                                    }
                                }
                            }
                        }

                        let current: $type = self.$name.clone();
                        self.$name = <$type>::parse(ENV_VAR_NAME, maybe_env_value, current);
                    }
                )+
            }
        }

        /// Type alias for easier reference in config aggregation
        pub type ConfigValues = ConfigValueGroup;
    };
}
