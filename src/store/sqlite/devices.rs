use super::{SqliteStore, blob};
use crate::models::{Device, DeviceStatus};
use crate::store::DeviceRepo;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::instrument;

const COLUMNS: &str = "id, ip_address, mac_address, hostname, custom_name, vendor, device_type, status, \
     is_gateway, is_monitored, first_seen, last_seen, latency_ms, packet_loss, open_ports, notes";

fn parse_device_row(row: &SqliteRow) -> anyhow::Result<Device> {
    let open_ports: Vec<u8> = row.try_get("open_ports")?;
    Ok(Device {
        id: row.try_get("id")?,
        ip_address: row.try_get("ip_address")?,
        mac_address: row.try_get("mac_address")?,
        hostname: row.try_get("hostname")?,
        custom_name: row.try_get("custom_name")?,
        vendor: row.try_get("vendor")?,
        device_type: row.try_get::<String, _>("device_type")?.parse()?,
        status: row.try_get::<String, _>("status")?.parse()?,
        is_gateway: row.try_get("is_gateway")?,
        is_monitored: row.try_get("is_monitored")?,
        first_seen: row.try_get("first_seen")?,
        last_seen: row.try_get("last_seen")?,
        latency_ms: row.try_get("latency_ms")?,
        packet_loss: row.try_get("packet_loss")?,
        open_ports: blob::decode_ports(&open_ports)?,
        notes: row.try_get("notes")?,
    })
}

#[async_trait]
impl DeviceRepo for SqliteStore {
    #[instrument(skip(self), fields(repo = "devices", operation = "get_all"))]
    async fn get_all(&self) -> anyhow::Result<Vec<Device>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM devices ORDER BY ip_address",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_device_row).collect()
    }

    #[instrument(skip(self), fields(repo = "devices", operation = "get_monitored"))]
    async fn get_monitored(&self) -> anyhow::Result<Vec<Device>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM devices WHERE is_monitored = 1 ORDER BY ip_address",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_device_row).collect()
    }

    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Device>> {
        let row = sqlx::query(&format!("SELECT {} FROM devices WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_device_row).transpose()
    }

    async fn find_by_mac(&self, mac: &str) -> anyhow::Result<Option<Device>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM devices WHERE mac_address = $1",
            COLUMNS
        ))
        .bind(mac)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_device_row).transpose()
    }

    #[instrument(skip(self, device), fields(repo = "devices", operation = "create", mac = %device.mac_address))]
    async fn create(&self, device: &Device) -> anyhow::Result<()> {
        let open_ports = blob::encode_ports(&device.open_ports)?;
        sqlx::query(&format!(
            "INSERT INTO devices ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            COLUMNS
        ))
        .bind(&device.id)
        .bind(&device.ip_address)
        .bind(&device.mac_address)
        .bind(&device.hostname)
        .bind(&device.custom_name)
        .bind(&device.vendor)
        .bind(device.device_type.as_str())
        .bind(device.status.as_str())
        .bind(device.is_gateway)
        .bind(device.is_monitored)
        .bind(device.first_seen)
        .bind(device.last_seen)
        .bind(device.latency_ms)
        .bind(device.packet_loss)
        .bind(&open_ports)
        .bind(&device.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, device), fields(repo = "devices", operation = "update", id = %device.id))]
    async fn update(&self, device: &Device) -> anyhow::Result<()> {
        let open_ports = blob::encode_ports(&device.open_ports)?;
        sqlx::query(
            "UPDATE devices SET ip_address = $1, hostname = $2, custom_name = $3, vendor = $4, device_type = $5, \
             status = $6, is_gateway = $7, is_monitored = $8, last_seen = $9, latency_ms = $10, packet_loss = $11, \
             open_ports = $12, notes = $13 WHERE id = $14",
        )
        .bind(&device.ip_address)
        .bind(&device.hostname)
        .bind(&device.custom_name)
        .bind(&device.vendor)
        .bind(device.device_type.as_str())
        .bind(device.status.as_str())
        .bind(device.is_gateway)
        .bind(device.is_monitored)
        .bind(device.last_seen)
        .bind(device.latency_ms)
        .bind(device.packet_loss)
        .bind(&open_ports)
        .bind(&device.notes)
        .bind(&device.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_seen(&self, id: &str, ip_address: &str, now: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE devices SET status = $1, ip_address = $2, last_seen = $3 WHERE id = $4",
        )
        .bind(DeviceStatus::Online.as_str())
        .bind(ip_address)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, ids), fields(repo = "devices", operation = "mark_offline", count = ids.len()))]
    async fn mark_offline(&self, ids: &[String]) -> anyhow::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("UPDATE devices SET status = $1 WHERE id = $2")
                .bind(DeviceStatus::Offline.as_str())
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: DeviceStatus,
        latency_ms: Option<f64>,
        packet_loss: Option<f64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE devices SET status = $1, latency_ms = $2, packet_loss = $3 WHERE id = $4",
        )
        .bind(status.as_str())
        .bind(latency_ms)
        .bind(packet_loss)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "devices", operation = "delete"))]
    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
