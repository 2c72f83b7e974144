//! # Ledger of exposed sdk interfaces
//!
//! The ledger is the source of truth for what the guest may reach. It is compiled
//! into the binary: every interface has a fixed allow-list of method names, and the
//! callback table lists every native event type by its symbolic name.
//!
//! Nothing here inspects the live sdk client. The debug-only reflection answers come
//! from the same tables, so production calls never depend on reflection.

/// Name of the interface that is special-cased into event subscription.
pub const CALLBACK_INTERFACE: &str = "Callback";

/// Name of the callback-type table inside the callback interface.
pub const CALLBACK_TABLE: &str = "SteamCallback";

/// Members of the callback interface, in the order reflection reports them.
pub const CALLBACK_MEMBERS: &[&str] = &["register", CALLBACK_TABLE];

/// A callable interface and its method allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceSchema {
    pub name: &'static str,
    pub methods: &'static [&'static str],
}

impl InterfaceSchema {
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains(&method)
    }
}

/// Every callable interface.
pub static INTERFACES: &[InterfaceSchema] = &[
    InterfaceSchema {
        name: "Achievement",
        methods: &["activate", "isActivated", "clear", "names"],
    },
    InterfaceSchema {
        name: "Apps",
        methods: &[
            "isSubscribedApp",
            "isAppInstalled",
            "isDlcInstalled",
            "isSubscribedFromFreeWeekend",
            "isVacBanned",
            "isCybercafe",
            "isLowViolence",
            "isSubscribed",
            "appBuildId",
            "appInstallDir",
            "appOwner",
            "availableGameLanguages",
            "currentGameLanguage",
            "currentBetaName",
        ],
    },
    InterfaceSchema {
        name: "Auth",
        methods: &["getSessionTicketWithSteamId", "getSessionTicketWithIp", "getAuthTicketForWebApi"],
    },
    InterfaceSchema {
        name: "Cloud",
        methods: &[
            "isEnabledForAccount",
            "isEnabledForApp",
            "setEnabledForApp",
            "readFile",
            "writeFile",
            "deleteFile",
            "fileExists",
            "listFiles",
        ],
    },
    InterfaceSchema {
        name: "Input",
        methods: &["init", "getControllers", "getActionSet", "getDigitalAction", "getAnalogAction", "shutdown"],
    },
    InterfaceSchema {
        name: "Localplayer",
        methods: &["getSteamId", "getName", "getLevel", "getIpCountry", "setRichPresence"],
    },
    InterfaceSchema {
        name: "Matchmaking",
        methods: &["createLobby", "joinLobby", "getLobbies"],
    },
    InterfaceSchema {
        name: "Networking",
        methods: &["sendP2PPacket", "isP2PPacketAvailable", "readP2PPacket", "acceptP2PSession"],
    },
    InterfaceSchema {
        name: "Overlay",
        methods: &[
            "activateDialog",
            "activateDialogToUser",
            "activateInviteDialog",
            "activateToWebPage",
            "activateToStore",
        ],
    },
    InterfaceSchema {
        name: "Stats",
        methods: &["getInt", "setInt", "store", "resetAll"],
    },
    InterfaceSchema {
        name: "Utils",
        methods: &[
            "getAppId",
            "getServerRealTime",
            "isSteamRunningOnSteamDeck",
            "showGamepadTextInput",
            "showFloatingGamepadTextInput",
        ],
    },
    InterfaceSchema {
        name: "Workshop",
        methods: &[
            "createItem",
            "updateItem",
            "subscribe",
            "unsubscribe",
            "state",
            "installInfo",
            "downloadInfo",
            "download",
            "getSubscribedItems",
        ],
    },
];

/// Looks up a callable interface by name.
pub fn interface(name: &str) -> Option<&'static InterfaceSchema> {
    INTERFACES.iter().find(|schema| schema.name == name)
}

/// Native event types the sdk can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackType {
    PersonaStateChange,
    SteamServersConnected,
    SteamServersDisconnected,
    SteamServerConnectFailure,
    LobbyDataUpdate,
    LobbyChatUpdate,
    P2PSessionRequest,
    P2PSessionConnectFail,
    GameLobbyJoinRequested,
    MicroTxnAuthorizationResponse,
}

impl CallbackType {
    pub const ALL: [CallbackType; 10] = [
        CallbackType::PersonaStateChange,
        CallbackType::SteamServersConnected,
        CallbackType::SteamServersDisconnected,
        CallbackType::SteamServerConnectFailure,
        CallbackType::LobbyDataUpdate,
        CallbackType::LobbyChatUpdate,
        CallbackType::P2PSessionRequest,
        CallbackType::P2PSessionConnectFail,
        CallbackType::GameLobbyJoinRequested,
        CallbackType::MicroTxnAuthorizationResponse,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PersonaStateChange => "PersonaStateChange",
            Self::SteamServersConnected => "SteamServersConnected",
            Self::SteamServersDisconnected => "SteamServersDisconnected",
            Self::SteamServerConnectFailure => "SteamServerConnectFailure",
            Self::LobbyDataUpdate => "LobbyDataUpdate",
            Self::LobbyChatUpdate => "LobbyChatUpdate",
            Self::P2PSessionRequest => "P2PSessionRequest",
            Self::P2PSessionConnectFail => "P2PSessionConnectFail",
            Self::GameLobbyJoinRequested => "GameLobbyJoinRequested",
            Self::MicroTxnAuthorizationResponse => "MicroTxnAuthorizationResponse",
        }
    }

    /// Resolves a symbolic name against the callback table.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }
}

impl std::fmt::Display for CallbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Member names found by walking the tables along `path`.
///
/// - `[]`: interface names, the callback interface last
/// - `[interface]`: its methods
/// - `[Callback]`: `register` and the callback table
/// - `[Callback, SteamCallback]`: callback type names
///
/// Any other path has no members.
pub fn members<S: AsRef<str>>(path: &[S]) -> Vec<String> {
    let path: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
    let names: Vec<&str> = match path.as_slice() {
        [] => INTERFACES
            .iter()
            .map(|schema| schema.name)
            .chain(std::iter::once(CALLBACK_INTERFACE))
            .collect(),
        [CALLBACK_INTERFACE] => CALLBACK_MEMBERS.to_vec(),
        [CALLBACK_INTERFACE, CALLBACK_TABLE] => CallbackType::ALL.iter().map(|ty| ty.name()).collect(),
        [name] => interface(name).map(|schema| schema.methods.to_vec()).unwrap_or_default(),
        _ => Vec::new(),
    };
    names.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_lookup() {
        let utils = interface("Utils").expect("Utils missing");
        assert!(utils.has_method("getAppId"));
        assert!(!utils.has_method("getAppID"));
        assert!(interface("utils").is_none());
        assert!(interface(CALLBACK_INTERFACE).is_none());
    }

    #[test]
    fn test_interface_names_are_unique() {
        let mut names: Vec<_> = INTERFACES.iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), INTERFACES.len());
    }

    #[test]
    fn test_callback_table_roundtrip() {
        for ty in CallbackType::ALL {
            assert_eq!(CallbackType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(CallbackType::from_name("NotAnEvent"), None);
    }

    #[test]
    fn test_members_walk() {
        let root = members::<&str>(&[]);
        assert!(root.contains(&"Utils".to_string()));
        assert_eq!(root.last().map(String::as_str), Some(CALLBACK_INTERFACE));

        assert!(members(&["Utils"]).contains(&"getAppId".to_string()));
        assert_eq!(members(&["Callback"]), vec!["register", "SteamCallback"]);
        assert_eq!(members(&["Callback", "SteamCallback"]).len(), CallbackType::ALL.len());
    }

    #[test]
    fn test_members_of_unknown_path_is_empty() {
        assert!(members(&["Nope"]).is_empty());
        assert!(members(&["Utils", "getAppId"]).is_empty());
        assert!(members(&["Callback", "SteamCallback", "PersonaStateChange"]).is_empty());
    }
}
