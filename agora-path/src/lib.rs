use std::path::PathBuf;

/// 数据库相关路径常量
pub const DB_DATA_DIR: &str = "data";
pub const DB_FILE_NAME: &str = "agora.db";
pub const DATA_DIR_ENV: &str = "AGORA_DATA_DIR";

/// 是否通过环境变量指定了数据目录
pub fn is_custom_data_dir() -> bool {
    std::env::var_os(DATA_DIR_ENV).is_some_and(|v| !v.is_empty())
}

/// 获取基础数据目录
///
/// 优先使用 `AGORA_DATA_DIR`，否则使用系统应用数据目录
pub fn get_base_data_dir() -> Result<PathBuf, String> {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => get_system_data_dir(),
    }
}

/// 获取系统数据目录（跨平台）
fn get_system_data_dir() -> Result<PathBuf, String> {
    use directories::BaseDirs;

    let base_dirs = BaseDirs::new().ok_or_else(|| "无法获取系统目录信息".to_string())?;

    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        Ok(base_dirs.data_dir().join("dev.agora.core"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Ok(base_dirs.data_dir().join("agora"))
    }
}

/// 获取数据库文件路径
pub fn get_db_path() -> Result<PathBuf, String> {
    Ok(get_base_data_dir()?.join(DB_DATA_DIR).join(DB_FILE_NAME))
}
