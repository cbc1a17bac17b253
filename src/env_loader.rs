use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(
    keeper_home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    match keeper_home {
        Some(dir) => Some(dir.join(".env")),
        None => home_dir.map(|home| home.join(".dt-keeper/.env")),
    }
}

/// Load `.env` from the working directory, else from the keeper home.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("DT_KEEPER_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn keeper_home_env_file_sits_at_its_root() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/srv/keeper")),
            Some(PathBuf::from("/home/alice")),
        );
        assert_eq!(got, Some(PathBuf::from("/srv/keeper/.env")));
    }

    #[test]
    fn falls_back_to_dot_dir_under_home() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        assert_eq!(got, Some(PathBuf::from("/home/alice/.dt-keeper/.env")));
    }

    #[test]
    fn nothing_to_load_without_any_home() {
        assert_eq!(fallback_dotenv_path(None, None), None);
    }
}
