//! Mini-game menu
//!
//! Lists the game catalog, launches a game with the host's character and
//! shows at most one post-game ad per selected game.

use std::sync::Arc;

use crate::session::{AdServer, SessionManagerGeneric};
use crate::types::{ChatMessage, GameCharacter, GameData, GameInitRequest, GameLaunch};
use crate::{Error, Result};

/// Default number of catalog entries shown
pub const DEFAULT_MAX_GAMES: usize = 6;

/// Host-supplied menu options
#[derive(Debug, Clone)]
pub struct MiniGameOptions {
    pub character: GameCharacter,
    pub messages: Vec<ChatMessage>,
    pub max_games_to_show: usize,
    /// Let the game speak as the character
    pub delegate_character: bool,
    /// Viewport size reported to the game server
    pub viewport: (u32, u32),
}

impl MiniGameOptions {
    pub fn new(character: GameCharacter) -> Self {
        Self {
            character,
            messages: Vec::new(),
            max_games_to_show: DEFAULT_MAX_GAMES,
            delegate_character: true,
            viewport: (1280, 720),
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_max_games(mut self, max: usize) -> Self {
        self.max_games_to_show = max;
        self
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }
}

/// Mini-game menu bound to a session
pub struct MiniGameMenu<T: AdServer> {
    manager: Arc<SessionManagerGeneric<T>>,
    options: MiniGameOptions,
    is_open: bool,
    games: Vec<GameData>,
    catalog_error: bool,
    selected_game: Option<String>,
    current_ad_id: Option<String>,
    post_game_attempted: bool,
    post_game_ad: Option<String>,
}

impl<T: AdServer> MiniGameMenu<T> {
    pub fn new(manager: Arc<SessionManagerGeneric<T>>, options: MiniGameOptions) -> Self {
        Self {
            manager,
            options,
            is_open: false,
            games: Vec::new(),
            catalog_error: false,
            selected_game: None,
            current_ad_id: None,
            post_game_attempted: false,
            post_game_ad: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Catalog could not be loaded on the last open
    pub fn catalog_error(&self) -> bool {
        self.catalog_error
    }

    pub fn selected_game(&self) -> Option<&str> {
        self.selected_game.as_deref()
    }

    /// Iframe URL of the post-game ad being shown
    pub fn post_game_ad(&self) -> Option<&str> {
        self.post_game_ad.as_deref()
    }

    /// Games to display, capped at `max_games_to_show`
    pub fn visible_games(&self) -> &[GameData] {
        let len = self.games.len().min(self.options.max_games_to_show);
        &self.games[..len]
    }

    /// Open the menu and load the catalog
    pub async fn open(&mut self) -> &[GameData] {
        self.is_open = true;
        self.catalog_error = false;

        match self.manager.server().fetch_catalog().await {
            Ok(games) => {
                tracing::debug!("Loaded {} games", games.len());
                self.games = games;
            }
            Err(e) => {
                tracing::error!(
                    "Failed to load game catalog: {}",
                    crate::error::format_error_for_logging(&e)
                );
                self.catalog_error = true;
                self.games.clear();
            }
        }

        self.visible_games()
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// Launch a game, closing the menu
    ///
    /// # Errors
    ///
    /// `Error::Session` without a server session, or the launch failure.
    pub async fn select_game(&mut self, game_id: &str) -> Result<GameLaunch> {
        self.close();
        self.selected_game = Some(game_id.to_string());
        self.post_game_attempted = false;
        self.current_ad_id = None;

        let Some(session_id) = self.manager.session_id() else {
            return Err(Error::session("Session invalid, cannot initialize minigame"));
        };

        let character = &self.options.character;
        let request = GameInitRequest {
            game_type: game_id.to_string(),
            session_id: session_id.to_string(),
            currency_mode: false,
            w: self.options.viewport.0,
            h: self.options.viewport.1,
            char_id: character.id.clone(),
            char_name: character.name.clone(),
            char_image: character.image.clone(),
            char_desc: character.description.clone(),
            messages: self.options.messages.clone(),
            delegate_char: self.options.delegate_character,
        };

        let launch = self
            .manager
            .server()
            .init_game(self.manager.api_key(), &request)
            .await?;
        tracing::info!("Launched game {} (ad {:?})", game_id, launch.ad_id);
        self.current_ad_id = launch.ad_id.clone();
        Ok(launch)
    }

    /// Close the running game, fetching the post-game ad on the first close
    pub async fn close_game(&mut self) -> Option<String> {
        self.selected_game = None;
        if self.post_game_attempted {
            return None;
        }
        let ad_id = self.current_ad_id.clone()?;
        self.post_game_attempted = true;

        match self
            .manager
            .server()
            .fetch_post_game_ad(self.manager.api_key(), &ad_id)
            .await
        {
            Ok(url) => {
                self.post_game_ad = url.clone();
                url
            }
            Err(e) => {
                tracing::warn!("Error fetching post-game ad: {}", e);
                None
            }
        }
    }

    /// Dismiss the post-game ad; no other ad follows for this selection
    pub fn close_post_game_ad(&mut self) {
        self.post_game_ad = None;
    }
}
